//! Adversarial authorization suite.
//!
//! Every test here tries to get an action admitted that must not be. A
//! single `authorized: true` where a denial is expected is a failure of the
//! whole control plane, so the suite leans on boundaries, expiry, ownership
//! and malformed input rather than on the happy path.

#![allow(clippy::arithmetic_side_effects)]

mod common;

use chrono::Duration;
use serde_json::json;
use warrant_authz::{
    AuthzError, Conditions, GrantRequest, NO_AUTHORIZATION_REASON, RECIPIENT_KEY, Scope,
};
use warrant_config::Config;
use warrant_core::{ActionClass, Clock, Metadata};
use warrant_test::FixedClock;

use common::{Harness, alice, mallory};

fn all_classes() -> Vec<ActionClass> {
    [
        "send_email",
        "create_calendar_event",
        "update_calendar_event",
        "delete_calendar_event",
        "create_github_issue",
        "update_github_issue",
        "post_slack_message",
        "create_task",
        "update_task",
        "transfer_funds",
    ]
    .into_iter()
    .map(ActionClass::parse)
    .collect()
}

fn recipient(value: serde_json::Value) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(RECIPIENT_KEY.to_string(), value);
    metadata
}

// ---------------------------------------------------------------------------
// No grant, no action
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_grant_denies_every_action_class() {
    let h = Harness::new();

    for class in all_classes() {
        let decision = h
            .warrant
            .authorizations()
            .check_authorization(&alice(), &class, Some(1.0), &Metadata::new())
            .await;
        assert!(!decision.authorized, "{class} admitted without a grant");
        assert_eq!(decision.reason.as_deref(), Some(NO_AUTHORIZATION_REASON));
        assert!(decision.authorization_id.is_none());
    }
}

#[tokio::test]
async fn grant_for_one_class_does_not_cover_another() {
    let h = Harness::new();
    h.grant(&alice(), ActionClass::CreateTask, Conditions::new()).await;

    for class in all_classes() {
        let allowed = h.allowed(&alice(), &class, Some(1.0)).await;
        assert_eq!(allowed, class == ActionClass::CreateTask, "{class}");
    }
}

#[tokio::test]
async fn grant_to_one_user_never_authorizes_another() {
    let h = Harness::new();
    for class in all_classes() {
        h.grant(&alice(), class, Conditions::new()).await;
    }

    for class in all_classes() {
        assert!(h.allowed(&alice(), &class, Some(1.0)).await);
        assert!(!h.allowed(&mallory(), &class, Some(1.0)).await, "{class}");
    }
}

// ---------------------------------------------------------------------------
// Expiry and revocation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn grant_expired_at_creation_is_inactive() {
    let h = Harness::new();
    let past = h.clock.now().saturating_sub(Duration::hours(1));
    h.warrant
        .authorizations()
        .grant_authorization(
            GrantRequest::new(alice(), ActionClass::SendEmail).expires_at(past),
        )
        .await
        .unwrap();

    assert!(!h.allowed(&alice(), &ActionClass::SendEmail, Some(1.0)).await);
}

#[tokio::test]
async fn grant_stops_working_at_its_expiry_instant() {
    let h = Harness::new();
    let expiry = h.clock.now().saturating_add(Duration::hours(1));
    h.warrant
        .authorizations()
        .grant_authorization(
            GrantRequest::new(alice(), ActionClass::CreateTask).expires_at(expiry),
        )
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(59));
    assert!(h.allowed(&alice(), &ActionClass::CreateTask, None).await);

    h.clock.set(expiry);
    assert!(!h.allowed(&alice(), &ActionClass::CreateTask, None).await);

    h.clock.advance(Duration::days(30));
    assert!(!h.allowed(&alice(), &ActionClass::CreateTask, None).await);
}

#[tokio::test]
async fn revoke_takes_effect_immediately() {
    let h = Harness::new();
    let grant = h.grant(&alice(), ActionClass::SendEmail, Conditions::new()).await;
    assert!(h.allowed(&alice(), &ActionClass::SendEmail, Some(0.99)).await);

    h.warrant
        .authorizations()
        .revoke_authorization(&grant.id, &alice(), Some("changed my mind".into()))
        .await
        .unwrap();

    assert!(!h.allowed(&alice(), &ActionClass::SendEmail, Some(0.99)).await);
}

#[tokio::test]
async fn only_the_owner_can_revoke() {
    let h = Harness::new();
    let grant = h.grant(&alice(), ActionClass::SendEmail, Conditions::new()).await;

    let err = h
        .warrant
        .authorizations()
        .revoke_authorization(&grant.id, &mallory(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::AccessDenied));
    assert_eq!(err.to_string(), "Access denied");

    let stored = h
        .warrant
        .authorizations()
        .get_authorization(&grant.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.revoked_at.is_none());
    assert!(h.allowed(&alice(), &ActionClass::SendEmail, None).await);
}

#[tokio::test]
async fn round_trip_preserves_grant_and_leaves_it_unrevoked() {
    let h = Harness::new();
    let conditions = Conditions::new()
        .confidence_threshold(0.8)
        .max_per_day(5)
        .recipients(["a@x.com"]);
    let granted = h
        .warrant
        .authorizations()
        .grant_authorization(
            GrantRequest::new(alice(), ActionClass::SendEmail)
                .with_scope(Scope::Conditional)
                .with_conditions(conditions.clone()),
        )
        .await
        .unwrap();

    let loaded = h
        .warrant
        .authorizations()
        .get_authorization(&granted.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.scope, Scope::Conditional);
    assert_eq!(loaded.conditions, conditions);
    assert_eq!(loaded.action_class, ActionClass::SendEmail);
    assert!(loaded.revoked_at.is_none());
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn confidence_threshold_boundary() {
    let h = Harness::new();
    h.grant(
        &alice(),
        ActionClass::SendEmail,
        Conditions::new().confidence_threshold(0.9),
    )
    .await;

    assert!(h.allowed(&alice(), &ActionClass::SendEmail, Some(0.9)).await);
    assert!(h.allowed(&alice(), &ActionClass::SendEmail, Some(1.0)).await);
    assert!(!h.allowed(&alice(), &ActionClass::SendEmail, Some(0.899_999)).await);
    assert!(!h.allowed(&alice(), &ActionClass::SendEmail, Some(0.0)).await);
    assert!(!h.allowed(&alice(), &ActionClass::SendEmail, None).await);
}

#[tokio::test]
async fn confidence_scenario_reports_reason() {
    let h = Harness::new();
    h.grant(
        &alice(),
        ActionClass::SendEmail,
        Conditions::new().confidence_threshold(0.9),
    )
    .await;

    let high = h
        .warrant
        .authorizations()
        .check_authorization(&alice(), &ActionClass::SendEmail, Some(0.95), &Metadata::new())
        .await;
    assert!(high.authorized);

    let low = h
        .warrant
        .authorizations()
        .check_authorization(&alice(), &ActionClass::SendEmail, Some(0.7), &Metadata::new())
        .await;
    assert!(!low.authorized);
    assert!(low.reason.unwrap().contains("below threshold"));
}

#[tokio::test]
async fn malformed_confidence_is_never_admitted() {
    let h = Harness::new();
    h.grant(&alice(), ActionClass::CreateTask, Conditions::new()).await;

    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1.5, -0.1] {
        let decision = h
            .warrant
            .authorizations()
            .check_authorization(&alice(), &ActionClass::CreateTask, Some(bad), &Metadata::new())
            .await;
        assert!(!decision.authorized, "confidence {bad} admitted");
        assert!(decision.reason.is_some());
    }
}

// ---------------------------------------------------------------------------
// Whitelists
// ---------------------------------------------------------------------------

#[tokio::test]
async fn recipient_whitelist_scenario() {
    let h = Harness::new();
    h.grant(
        &alice(),
        ActionClass::SendEmail,
        Conditions::new().recipients(["a@x.com"]),
    )
    .await;

    let decision = h
        .warrant
        .authorizations()
        .check_authorization(
            &alice(),
            &ActionClass::SendEmail,
            Some(0.95),
            &recipient(json!("b@y.com")),
        )
        .await;
    assert!(!decision.authorized);
    assert!(decision.reason.unwrap().contains("not in whitelist"));
}

#[tokio::test]
async fn recipient_whitelist_rejects_smuggling_attempts() {
    let h = Harness::new();
    h.grant(
        &alice(),
        ActionClass::SendEmail,
        Conditions::new().recipients(["a@x.com"]),
    )
    .await;
    let check = |metadata: Metadata| {
        let h = &h;
        async move {
            h.warrant
                .authorizations()
                .check_authorization(&alice(), &ActionClass::SendEmail, Some(1.0), &metadata)
                .await
                .authorized
        }
    };

    assert!(!check(Metadata::new()).await, "missing recipient");
    assert!(!check(recipient(json!(""))).await, "empty recipient");
    assert!(!check(recipient(json!(null))).await, "null recipient");
    assert!(!check(recipient(json!(42))).await, "non-string recipient");
    assert!(!check(recipient(json!([]))).await, "empty list");
    assert!(!check(recipient(json!(["a@x.com", "b@y.com"]))).await, "one bad in list");
    assert!(!check(recipient(json!("a@x.com.evil.io"))).await, "suffix");
    assert!(!check(recipient(json!("a@x.co"))).await, "prefix");

    assert!(check(recipient(json!("a@x.com"))).await);
    assert!(check(recipient(json!("A@X.COM"))).await);
    assert!(check(recipient(json!(["a@x.com"]))).await);
}

#[tokio::test]
async fn calendar_whitelist_requires_listed_calendar() {
    let h = Harness::new();
    h.grant(
        &alice(),
        ActionClass::CreateCalendarEvent,
        Conditions::new().calendars(["work"]),
    )
    .await;

    let check = |calendar: Option<&str>| {
        let h = &h;
        let mut metadata = Metadata::new();
        if let Some(id) = calendar {
            metadata.insert(warrant_authz::CALENDAR_KEY.to_string(), json!(id));
        }
        async move {
            h.warrant
                .authorizations()
                .check_authorization(&alice(), &ActionClass::CreateCalendarEvent, None, &metadata)
                .await
        }
    };

    assert!(check(Some("work")).await.authorized);
    let personal = check(Some("personal")).await;
    assert!(!personal.authorized);
    assert!(personal.reason.unwrap().contains("not in whitelist"));
    assert!(!check(None).await.authorized);
}

// ---------------------------------------------------------------------------
// Rate limits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn daily_limit_counts_only_successes() {
    let h = Harness::new();
    h.grant(
        &alice(),
        ActionClass::CreateTask,
        Conditions::new().max_per_day(2),
    )
    .await;

    h.log_success(&alice(), ActionClass::CreateTask, json!({ "taskId": "1" })).await;
    h.log_failure(&alice(), ActionClass::CreateTask).await;
    h.log_failure(&alice(), ActionClass::CreateTask).await;
    assert!(h.allowed(&alice(), &ActionClass::CreateTask, None).await);

    h.log_success(&alice(), ActionClass::CreateTask, json!({ "taskId": "2" })).await;
    let decision = h
        .warrant
        .authorizations()
        .check_authorization(&alice(), &ActionClass::CreateTask, None, &Metadata::new())
        .await;
    assert!(!decision.authorized);
    assert!(decision.reason.unwrap().starts_with("Daily limit reached"));
}

#[tokio::test]
async fn daily_limit_ignores_other_users_and_classes() {
    let h = Harness::new();
    h.grant(
        &alice(),
        ActionClass::CreateTask,
        Conditions::new().max_per_day(1),
    )
    .await;

    h.log_success(&mallory(), ActionClass::CreateTask, json!({})).await;
    h.log_success(&alice(), ActionClass::UpdateTask, json!({})).await;
    assert!(h.allowed(&alice(), &ActionClass::CreateTask, None).await);
}

#[tokio::test]
async fn daily_limit_resets_at_local_midnight() {
    let h = Harness::with_clock(Config::default(), FixedClock::at_utc(2025, 6, 4, 23, 0));
    h.grant(
        &alice(),
        ActionClass::CreateTask,
        Conditions::new().max_per_day(1),
    )
    .await;
    h.log_success(&alice(), ActionClass::CreateTask, json!({})).await;
    assert!(!h.allowed(&alice(), &ActionClass::CreateTask, None).await);

    h.clock.advance(Duration::hours(2));
    assert!(h.allowed(&alice(), &ActionClass::CreateTask, None).await);
}

#[tokio::test]
async fn weekly_limit_spans_days() {
    // Wednesday; the week started on Sunday 2025-06-01.
    let h = Harness::new();
    h.grant(
        &alice(),
        ActionClass::PostSlackMessage,
        Conditions::new().max_per_week(2),
    )
    .await;

    h.clock.advance(Duration::days(-2));
    h.log_success(&alice(), ActionClass::PostSlackMessage, json!({})).await;
    h.clock.advance(Duration::days(1));
    h.log_success(&alice(), ActionClass::PostSlackMessage, json!({})).await;
    h.clock.advance(Duration::days(1));

    assert!(!h.allowed(&alice(), &ActionClass::PostSlackMessage, None).await);
}

// ---------------------------------------------------------------------------
// Allowed hours
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overnight_window_is_closed_by_default() {
    let h = Harness::with_clock(Config::default(), FixedClock::at_utc(2025, 6, 4, 23, 0));
    h.grant(
        &alice(),
        ActionClass::PostSlackMessage,
        Conditions::new().hours(22, 2),
    )
    .await;

    assert!(!h.allowed(&alice(), &ActionClass::PostSlackMessage, None).await);
}

#[tokio::test]
async fn overnight_window_opens_in_wrap_mode() {
    let config = Config::from_toml("[authorization]\nhours_window = \"wrap_midnight\"\n").unwrap();
    let h = Harness::with_clock(config, FixedClock::at_utc(2025, 6, 4, 23, 0));
    h.grant(
        &alice(),
        ActionClass::PostSlackMessage,
        Conditions::new().hours(22, 2),
    )
    .await;

    assert!(h.allowed(&alice(), &ActionClass::PostSlackMessage, None).await);
    h.clock.advance(Duration::hours(4));
    assert!(!h.allowed(&alice(), &ActionClass::PostSlackMessage, None).await);
}

#[tokio::test]
async fn window_end_hour_is_exclusive() {
    let h = Harness::with_clock(Config::default(), FixedClock::at_utc(2025, 6, 4, 17, 0));
    h.grant(
        &alice(),
        ActionClass::CreateTask,
        Conditions::new().hours(9, 17),
    )
    .await;

    assert!(!h.allowed(&alice(), &ActionClass::CreateTask, None).await);
    h.clock.advance(Duration::minutes(-1));
    assert!(h.allowed(&alice(), &ActionClass::CreateTask, None).await);
}

// ---------------------------------------------------------------------------
// Multiple grants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn looser_grant_wins_and_reasons_are_combined_on_denial() {
    let h = Harness::new();
    h.grant(
        &alice(),
        ActionClass::SendEmail,
        Conditions::new().confidence_threshold(0.99),
    )
    .await;
    let loose = h
        .grant(
            &alice(),
            ActionClass::SendEmail,
            Conditions::new().recipients(["a@x.com"]),
        )
        .await;

    let allowed = h
        .warrant
        .authorizations()
        .check_authorization(
            &alice(),
            &ActionClass::SendEmail,
            Some(0.5),
            &recipient(json!("a@x.com")),
        )
        .await;
    assert!(allowed.authorized);
    assert_eq!(allowed.authorization_id, Some(loose.id));

    let denied = h
        .warrant
        .authorizations()
        .check_authorization(
            &alice(),
            &ActionClass::SendEmail,
            Some(0.5),
            &recipient(json!("b@y.com")),
        )
        .await;
    assert!(!denied.authorized);
    let reason = denied.reason.unwrap();
    assert!(reason.contains("below threshold"));
    assert!(reason.contains("not in whitelist"));
    assert!(reason.contains("; "));
}

#[tokio::test]
async fn revoking_one_of_two_grants_keeps_the_other() {
    let h = Harness::new();
    let first = h.grant(&alice(), ActionClass::CreateTask, Conditions::new()).await;
    h.grant(&alice(), ActionClass::CreateTask, Conditions::new().confidence_threshold(0.9))
        .await;

    h.warrant
        .authorizations()
        .revoke_authorization(&first.id, &alice(), None)
        .await
        .unwrap();

    assert!(!h.allowed(&alice(), &ActionClass::CreateTask, Some(0.5)).await);
    assert!(h.allowed(&alice(), &ActionClass::CreateTask, Some(0.95)).await);
}
