//! Tests for the Supabase table reader.

use super::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer) -> SupabaseSource {
    SupabaseSource::new(&server.uri(), "anon-key", Duration::from_secs(5))
}

#[test]
fn test_supabase_source_type() {
    let source = SupabaseSource::new("http://localhost:54321", "k", Duration::from_secs(1));
    assert_eq!(source.source_type(), "supabase");
}

#[test]
fn test_supabase_build_table_url_trailing_slash() {
    let source = SupabaseSource::new("https://abc.supabase.co/", "k", Duration::from_secs(1));
    assert_eq!(
        source.build_table_url("profiles"),
        "https://abc.supabase.co/rest/v1/profiles"
    );
}

#[tokio::test]
async fn test_fetch_all_sends_auth_headers_and_returns_rows() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(header("apikey", "anon-key"))
        .and(header("Authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Ada"},
            {"id": 2, "name": "Grace"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let records = source_for(&server).fetch_all("users").await.unwrap();

    // Assert
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["name"], "Grace");
}

#[tokio::test]
async fn test_fetch_all_empty_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let records = source_for(&server).fetch_all("empty").await.unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_fetch_all_non_success_carries_status_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "relation does not exist"})))
        .mount(&server)
        .await;

    let err = source_for(&server).fetch_all("missing").await.unwrap_err();

    match err {
        Error::SourceFetch { table, message } => {
            assert_eq!(table, "missing");
            assert_eq!(message, "Supabase API error: 404 Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_all_rejects_non_array_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/odd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
        .mount(&server)
        .await;

    let err = source_for(&server).fetch_all("odd").await.unwrap_err();

    assert!(matches!(err, Error::SourceFetch { .. }));
}
