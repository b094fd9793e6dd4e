//! Tests for src/diagnose - per service account reports and summary

use crate::common::{self, FakeEks, FakeIam, FakeTrail};
use chrono::DateTime;
use iam4sa::diagnose::{cluster_oidc_provider, diagnose_cluster, Diagnostics, RoleState};
use iam4sa::error::Iam4saError;
use iam4sa::k8s::ServiceAccount;

fn service_account(namespace: &str, name: &str, role: &str) -> ServiceAccount {
    ServiceAccount {
        namespace: namespace.to_string(),
        name: name.to_string(),
        iam_role_arn: common::role_arn(role),
        pods: vec![format!("{name}-0")],
    }
}

fn fleet() -> Vec<ServiceAccount> {
    vec![
        service_account("apps", "web", "web"),
        service_account("apps", "orphan", "deleted-role"),
        service_account("apps", "worker", "worker"),
    ]
}

fn iam() -> FakeIam {
    FakeIam::default()
        .with_role(common::create_mock_role("web", "apps", "web"))
        .with_role(common::create_mock_role("worker", "apps", "worker"))
        .with_provider(common::create_mock_provider(common::ISSUER_ID))
}

fn trail() -> FakeTrail {
    let web = "system:serviceaccount:apps:web";
    let orphan = "system:serviceaccount:apps:orphan";
    FakeTrail::default()
        .with_pages(
            web,
            vec![
                vec![common::create_mock_event("w1", web, None)],
                vec![common::create_mock_event("w2", web, Some("AccessDenied"))],
            ],
        )
        .with_pages(
            orphan,
            vec![vec![
                common::create_mock_event("o1", orphan, Some("AccessDenied")),
                common::create_mock_event("o2", orphan, Some("AccessDenied")),
            ]],
        )
}

// ============================================================================
// Reports
// ============================================================================

#[tokio::test]
async fn test_missing_role_does_not_abort_later_accounts() {
    let (iam, trail) = (iam(), trail());
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let provider = common::create_mock_provider(common::ISSUER_ID);

    let reports = Diagnostics::at(&iam, &trail, now)
        .reports(&fleet(), Some(&provider))
        .await;

    assert_eq!(reports.len(), 3);
    assert!(matches!(reports[0].role, RoleState::Found(_)));
    assert_eq!(reports[1].role, RoleState::NotFound);
    assert!(reports[1].role.role().is_none());
    assert_eq!(reports[1].trust_matches(), None);
    assert_eq!(reports[1].failed_events().len(), 2);
    assert!(matches!(reports[2].role, RoleState::Found(_)));
}

#[tokio::test]
async fn test_role_lookup_failure_is_reported() {
    let mut iam = iam();
    iam.failing_roles.insert("web".to_string());
    let trail = trail();

    let reports = Diagnostics::new(&iam, &trail)
        .reports(&fleet(), None)
        .await;

    assert!(matches!(&reports[0].role, RoleState::Failed(reason) if reason.contains("web")));
    assert!(matches!(reports[2].role, RoleState::Found(_)));
}

#[tokio::test]
async fn test_trust_policy_match() {
    let (iam, trail) = (iam(), trail());
    let provider = common::create_mock_provider(common::ISSUER_ID);
    let diagnostics = Diagnostics::new(&iam, &trail);

    let report = diagnostics
        .report(&service_account("apps", "web", "web"), Some(&provider))
        .await;
    assert_eq!(report.trust_matches(), Some(true));

    // role trusts apps:web, not apps:api
    let report = diagnostics
        .report(&service_account("apps", "api", "web"), Some(&provider))
        .await;
    assert_eq!(report.trust_matches(), Some(false));

    let report = diagnostics
        .report(&service_account("apps", "web", "web"), None)
        .await;
    assert_eq!(report.trust_matches(), None);
}

#[tokio::test]
async fn test_event_failure_renders_zero_events() {
    let iam = iam();
    let mut trail = trail();
    trail
        .failing_usernames
        .insert("system:serviceaccount:apps:web".to_string());

    let report = Diagnostics::new(&iam, &trail)
        .report(&service_account("apps", "web", "web"), None)
        .await;

    assert!(report.events.is_empty());
    assert!(matches!(report.role, RoleState::Found(_)));
}

// ============================================================================
// Summary
// ============================================================================

#[tokio::test]
async fn test_summary_rows() {
    let (iam, trail) = (iam(), trail());
    let rows = Diagnostics::new(&iam, &trail).summary(&fleet()).await;

    let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["web", "orphan", "worker"]);

    assert_eq!(rows[0].role_account, common::ACCOUNT);
    assert_eq!(rows[0].role_name, "web");
    assert_eq!(rows[0].pods, 1);
    assert_eq!((rows[0].events, rows[0].failed_events), (2, 1));
    assert_eq!((rows[1].events, rows[1].failed_events), (2, 2));
    assert_eq!((rows[2].events, rows[2].failed_events), (0, 0));
}

// ============================================================================
// Cluster
// ============================================================================

#[tokio::test]
async fn test_diagnose_cluster_with_unreachable_issuer() {
    // host with a space never parses, so no connection is attempted
    let issuer = format!("https://bad host/id/{}", common::ISSUER_ID);
    let eks = FakeEks {
        cluster: Some(common::create_mock_cluster("prod", &issuer)),
    };

    let report = diagnose_cluster(&eks, &iam(), "prod").await.unwrap();

    assert_eq!(report.cluster.name, "prod");
    assert!(report.fingerprint.is_none());
    assert_eq!(report.thumbprint_matches(), None);
    assert_eq!(
        report.oidc_provider.as_found().unwrap().arn,
        common::provider_arn()
    );
}

#[tokio::test]
async fn test_diagnose_cluster_without_provider() {
    let issuer = "https://bad host/id/UNLINKED";
    let eks = FakeEks {
        cluster: Some(common::create_mock_cluster("prod", issuer)),
    };

    let report = diagnose_cluster(&eks, &iam(), "prod").await.unwrap();
    assert!(report.oidc_provider.is_not_found());
}

#[tokio::test]
async fn test_diagnose_cluster_errors() {
    let eks = FakeEks::default();

    let missing = diagnose_cluster(&eks, &iam(), "prod").await;
    assert!(matches!(missing, Err(Iam4saError::Config(_))));

    let unnamed = diagnose_cluster(&eks, &iam(), "").await;
    assert!(matches!(unnamed, Err(Iam4saError::Config(_))));
}

#[tokio::test]
async fn test_cluster_oidc_provider_degrades_to_none() {
    let eks = FakeEks {
        cluster: Some(common::create_mock_cluster(
            "prod",
            &common::cluster_issuer(common::ISSUER_ID),
        )),
    };

    let provider = cluster_oidc_provider(&eks, &iam(), "prod").await;
    assert_eq!(provider.unwrap().arn, common::provider_arn());

    let broken = FakeIam {
        fail_list_providers: true,
        ..Default::default()
    };
    assert!(cluster_oidc_provider(&eks, &broken, "prod").await.is_none());
    assert!(cluster_oidc_provider(&FakeEks::default(), &iam(), "prod").await.is_none());
}
