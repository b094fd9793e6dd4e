//! Tests for src/k8s - IAM service account enumeration

use crate::common::{self, FakeCluster};
use iam4sa::k8s::list_iam_service_accounts;

fn fleet() -> FakeCluster {
    FakeCluster::default()
        .with_service_account(common::create_mock_service_account(
            "web",
            "apps",
            Some(&common::role_arn("web")),
        ))
        .with_service_account(common::create_mock_service_account("default", "apps", None))
        .with_service_account(common::create_mock_service_account(
            "worker",
            "apps",
            Some(&common::role_arn("worker")),
        ))
        .with_service_account(common::create_mock_service_account(
            "fluent-bit",
            "logging",
            Some(&common::role_arn("fluent-bit")),
        ))
        .with_pods("apps", "web", &["web-7d9f-abcde", "web-7d9f-fghij"])
}

// ============================================================================
// Single namespace
// ============================================================================

#[tokio::test]
async fn test_single_namespace_keeps_annotated_only() {
    let cluster = fleet();
    let sas = list_iam_service_accounts(&cluster, "apps", "", "").await.unwrap();

    let names: Vec<_> = sas.iter().map(|sa| sa.name.as_str()).collect();
    assert_eq!(names, ["web", "worker"]);
    assert_eq!(cluster.listed(), ["apps"]);
}

#[tokio::test]
async fn test_pods_are_attached() {
    let cluster = fleet();
    let sas = list_iam_service_accounts(&cluster, "apps", "", "").await.unwrap();

    assert_eq!(sas[0].pods, ["web-7d9f-abcde", "web-7d9f-fghij"]);
    assert!(sas[1].pods.is_empty());
}

#[tokio::test]
async fn test_derived_role_fields() {
    let cluster = fleet();
    let sas = list_iam_service_accounts(&cluster, "apps", "", "").await.unwrap();

    assert_eq!(sas[0].role_account(), common::ACCOUNT);
    assert_eq!(sas[0].role_name(), "web");
    assert_eq!(sas[0].username(), "system:serviceaccount:apps:web");
}

#[tokio::test]
async fn test_malformed_annotation_is_skipped() {
    let cluster = FakeCluster::default()
        .with_service_account(common::create_mock_service_account("bad", "apps", Some("my-role")))
        .with_service_account(common::create_mock_service_account(
            "no-name",
            "apps",
            Some("arn:aws:iam::123456789012:role/"),
        ))
        .with_service_account(common::create_mock_service_account(
            "good",
            "apps",
            Some(&common::role_arn("good")),
        ));

    let sas = list_iam_service_accounts(&cluster, "apps", "", "").await.unwrap();
    let names: Vec<_> = sas.iter().map(|sa| sa.name.as_str()).collect();
    assert_eq!(names, ["good"]);
}

// ============================================================================
// All namespaces
// ============================================================================

#[tokio::test]
async fn test_all_namespaces_in_listing_order() {
    let cluster = fleet();
    let sas = list_iam_service_accounts(&cluster, "", "", "").await.unwrap();

    let keys: Vec<_> = sas
        .iter()
        .map(|sa| format!("{}/{}", sa.namespace, sa.name))
        .collect();
    assert_eq!(keys, ["apps/web", "apps/worker", "logging/fluent-bit"]);
    assert_eq!(cluster.listed(), ["apps", "logging"]);
}

#[tokio::test]
async fn test_namespace_failure_aborts_listing() {
    let mut cluster = fleet();
    cluster.namespaces.push("monitoring".to_string());
    cluster.failing_namespaces.insert("logging".to_string());

    let result = list_iam_service_accounts(&cluster, "", "", "").await;
    assert!(result.is_err());
    // monitoring is never reached
    assert_eq!(cluster.listed(), ["apps", "logging"]);
}

#[tokio::test]
async fn test_empty_cluster() {
    let cluster = FakeCluster::default();
    let sas = list_iam_service_accounts(&cluster, "", "", "").await.unwrap();
    assert!(sas.is_empty());
}
