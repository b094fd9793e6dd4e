//! Tests for src/aws/event.rs - CloudTrail event correlation

use crate::common::{self, FakeTrail};
use chrono::{DateTime, Duration};
use iam4sa::aws::{lookup_events, EVENTS_HOURS};

const USERNAME: &str = "system:serviceaccount:apps:web";

fn three_pages() -> FakeTrail {
    FakeTrail::default().with_pages(
        USERNAME,
        vec![
            vec![
                common::create_mock_event("e1", USERNAME, None),
                common::create_mock_event("e2", USERNAME, Some("AccessDenied")),
            ],
            vec![
                common::create_mock_event("e3", USERNAME, None),
                common::create_mock_event("e4", USERNAME, Some("InvalidIdentityToken")),
            ],
            vec![common::create_mock_event("e5", USERNAME, Some("AccessDenied"))],
        ],
    )
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_drains_all_pages_in_order() {
    let trail = three_pages();
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    let log = lookup_events(&trail, "apps", "web", now).await.unwrap();

    let ids: Vec<_> = log.iter().map(|e| e.event_id.as_str()).collect();
    assert_eq!(ids, ["e1", "e2", "e3", "e4", "e5"]);
    assert_eq!(log.failed().len(), 3);
}

#[tokio::test]
async fn test_follows_continuation_tokens() {
    let trail = three_pages();
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    lookup_events(&trail, "apps", "web", now).await.unwrap();

    let tokens: Vec<_> = trail.calls().into_iter().map(|(_, token)| token).collect();
    assert_eq!(
        tokens,
        [None, Some("page-1".to_string()), Some("page-2".to_string())]
    );
}

#[tokio::test]
async fn test_queries_service_account_username_over_window() {
    let trail = three_pages();
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    lookup_events(&trail, "apps", "web", now).await.unwrap();

    assert!(trail.calls().iter().all(|(username, _)| username == USERNAME));
    let windows = trail.windows.lock().unwrap().clone();
    for (start, end) in windows {
        assert_eq!(end, now);
        assert_eq!(end - start, Duration::hours(EVENTS_HOURS));
    }
}

#[tokio::test]
async fn test_no_events() {
    let trail = FakeTrail::default();
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    let log = lookup_events(&trail, "apps", "idle", now).await.unwrap();
    assert!(log.is_empty());
    assert_eq!(trail.calls().len(), 1);
}

#[tokio::test]
async fn test_page_failure_is_an_error() {
    let mut trail = three_pages();
    trail.failing_usernames.insert(USERNAME.to_string());
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    assert!(lookup_events(&trail, "apps", "web", now).await.is_err());
}

// ============================================================================
// Event detail
// ============================================================================

#[tokio::test]
async fn test_failed_event_carries_requested_role() {
    let trail = three_pages();
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    let log = lookup_events(&trail, "apps", "web", now).await.unwrap();
    let failed = log.failed();
    let first = failed.iter().next().unwrap();

    assert_eq!(first.event_id, "e2");
    assert_eq!(first.error_code, "AccessDenied");
    assert_eq!(first.request_parameters.role_arn, common::role_arn("requested"));
}
