//! Contract Test: PostgREST Table Access
//!
//! Constraints verified:
//! - Fetch asks only for unprocessed rows
//! - Mark touches exactly one row by id and only sets `processed`
//! - The key travels as `apikey` and as a bearer token
//! - HTTP failures surface as store errors

use dnssync_core::traits::RecordStore;
use dnssync_core::{Error, Operation, RecordType, RequestId};
use dnssync_store_supabase::SupabaseRecordStore;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "service-key";

fn store(server: &MockServer) -> SupabaseRecordStore {
    SupabaseRecordStore::new(server.uri(), KEY, "records").unwrap()
}

#[tokio::test]
async fn fetch_selects_unprocessed_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/records"))
        .and(query_param("select", "*"))
        .and(query_param("processed", "eq.false"))
        .and(header("apikey", KEY))
        .and(header("Authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 7,
                "perform": "UPDATE",
                "type": "a",
                "name": "www",
                "content": "192.0.2.7",
                "ttl": 120,
                "proxied": true,
                "processed": false
            },
            {
                "id": 8,
                "perform": null,
                "type": "TXT",
                "name": "@",
                "content": "v=spf1 -all",
                "ttl": null,
                "proxied": null,
                "processed": false
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let pending = store(&server).fetch_pending().await.unwrap();

    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, RequestId::Int(7));
    assert_eq!(pending[0].operation().unwrap(), Operation::Update);
    assert_eq!(pending[0].record_type, RecordType::A);
    assert_eq!(pending[0].ttl, Some(120));
    assert_eq!(pending[1].operation().unwrap(), Operation::Create);
    assert_eq!(pending[1].ttl, None);
}

#[tokio::test]
async fn fetch_accepts_tables_with_both_operation_columns() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 1,
                "perform": "update",
                "operation": null,
                "type": "A",
                "name": "www",
                "content": "192.0.2.1",
                "processed": false
            },
            {
                "id": 2,
                "perform": null,
                "operation": "delete",
                "type": "A",
                "name": "old",
                "content": null,
                "processed": false
            }
        ])))
        .mount(&server)
        .await;

    let pending = store(&server).fetch_pending().await.unwrap();

    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].operation().unwrap(), Operation::Update);
    assert_eq!(pending[1].operation().unwrap(), Operation::Delete);
}

#[tokio::test]
async fn fetch_skips_malformed_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "type": "A", "name": "ok", "content": "192.0.2.1", "processed": false},
            {"id": 2, "type": "A", "content": "192.0.2.2", "processed": false}
        ])))
        .mount(&server)
        .await;

    let pending = store(&server).fetch_pending().await.unwrap();

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, "ok");
}

#[tokio::test]
async fn fetch_failure_is_store_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/records"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid API key"
        })))
        .mount(&server)
        .await;

    let err = store(&server).fetch_pending().await.unwrap_err();
    assert!(matches!(err, Error::Store(ref msg) if msg.contains("Invalid API key")));
}

#[tokio::test]
async fn mark_patches_single_row() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/records"))
        .and(query_param("id", "eq.7"))
        .and(header("apikey", KEY))
        .and(header("Prefer", "return=minimal"))
        .and(body_json(json!({"processed": true})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .mark_processed(&RequestId::Int(7))
        .await
        .unwrap();
}

#[tokio::test]
async fn mark_with_text_id() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/records"))
        .and(query_param("id", "eq.6f1c2a"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .mark_processed(&RequestId::from("6f1c2a"))
        .await
        .unwrap();
}

#[tokio::test]
async fn mark_failure_is_store_error() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/records"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = store(&server)
        .mark_processed(&RequestId::Int(7))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
}
