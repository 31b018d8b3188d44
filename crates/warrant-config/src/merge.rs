//! Deep merge of TOML value trees.

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Set the value at a dotted path, creating intermediate tables.
///
/// A non-table found along the path is replaced by a table.
pub fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let Some(table) = ensure_table(root) else {
        return;
    };
    match path.split_once('.') {
        None => {
            table.insert(path.to_owned(), value);
        },
        Some((head, rest)) => {
            let child = table
                .entry(head.to_owned())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
            set_path(child, rest, value);
        },
    }
}

fn ensure_table(value: &mut toml::Value) -> Option<&mut toml::map::Map<String, toml::Value>> {
    if !value.is_table() {
        *value = toml::Value::Table(toml::map::Map::new());
    }
    value.as_table_mut()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_replaces_scalars_and_keeps_siblings() {
        let mut base = parse(
            r#"
            [rollback]
            window_hours = 24
            undo_timeout_secs = 30
        "#,
        );
        deep_merge(&mut base, &parse("[rollback]\nwindow_hours = 48"));

        assert_eq!(base["rollback"]["window_hours"].as_integer(), Some(48));
        assert_eq!(base["rollback"]["undo_timeout_secs"].as_integer(), Some(30));
    }

    #[test]
    fn test_arrays_are_replaced_not_appended() {
        let mut base = parse("[logging]\ndirectives = [\"a=debug\", \"b=warn\"]");
        deep_merge(&mut base, &parse("[logging]\ndirectives = [\"c=trace\"]"));

        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].as_str(), Some("c=trace"));
    }

    #[test]
    fn test_new_sections_are_added() {
        let mut base = parse("[audit]\nmax_page_size = 500");
        deep_merge(&mut base, &parse("[storage]\nbackend = \"surrealkv\""));

        assert_eq!(base["audit"]["max_page_size"].as_integer(), Some(500));
        assert_eq!(base["storage"]["backend"].as_str(), Some("surrealkv"));
    }

    #[test]
    fn test_set_path_creates_tables() {
        let mut root = toml::Value::Table(toml::map::Map::new());
        set_path(&mut root, "storage.path", toml::Value::String("/var/lib/w".into()));
        assert_eq!(root["storage"]["path"].as_str(), Some("/var/lib/w"));

        set_path(&mut root, "storage.backend", toml::Value::String("memory".into()));
        assert_eq!(root["storage"]["path"].as_str(), Some("/var/lib/w"));
        assert_eq!(root["storage"]["backend"].as_str(), Some("memory"));
    }
}
