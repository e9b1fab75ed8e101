//! Contract Test: Proxied Create Retry
//!
//! Constraints verified:
//! - A rejected proxied create is retried exactly once, with proxied=false
//! - No retry when the rejected create was not proxied
//! - No retry on transport errors
//! - No retry on rate limits or server errors, and the row stays pending
//! - The retry never happens more than once

mod common;

use common::*;
use dnssync_core::{
    Applied, ChangeRequest, Error, Operation, ReconcilePolicy, Reconciler, RequestId,
};
use std::sync::Arc;

#[tokio::test]
async fn rejected_proxied_create_retries_once_unproxied() {
    let provider = Arc::new(ScriptedProvider::new().rejecting_proxied());
    let adapter = adapter(&provider);

    let request = ChangeRequest::new(1, "CNAME", "shop", "shops.myshopify.com").with_proxied(true);
    let applied = adapter.apply(&request).await.expect("retry succeeds");

    assert_eq!(
        applied,
        Applied::Created {
            record_id: Some("new-record".to_string()),
            proxied_fallback: true,
        }
    );

    let creates = provider.creates();
    assert_eq!(creates.len(), 2, "expected exactly one retry");
    assert!(creates[0].proxied);
    assert!(!creates[1].proxied);
    assert_eq!(creates[0].content, creates[1].content);
    assert_eq!(creates[0].name, "shop", "create submits the name as given");
}

#[tokio::test]
async fn retry_happens_at_most_once() {
    let provider = Arc::new(ScriptedProvider::new().rejecting("shop"));
    let adapter = adapter(&provider);

    let request = ChangeRequest::new(1, "A", "shop", "192.0.2.10").with_proxied(true);
    let err = adapter.apply(&request).await.unwrap_err();

    assert!(matches!(err, Error::ProviderRejected { status: 400, .. }));
    assert_eq!(provider.creates().len(), 2);
}

#[tokio::test]
async fn unproxied_rejection_is_not_retried() {
    let provider = Arc::new(ScriptedProvider::new().rejecting("shop"));
    let adapter = adapter(&provider);

    let request = ChangeRequest::new(1, "A", "shop", "192.0.2.10").with_proxied(false);
    let err = adapter.apply(&request).await.unwrap_err();

    assert!(matches!(err, Error::ProviderRejected { .. }));
    assert_eq!(provider.creates().len(), 1);
}

#[tokio::test]
async fn transport_error_is_not_retried() {
    let provider = Arc::new(ScriptedProvider::new().unreachable_for("shop"));
    let adapter = adapter(&provider);

    let request = ChangeRequest::new(1, "A", "shop", "192.0.2.10").with_proxied(true);
    let err = adapter.apply(&request).await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(provider.creates().len(), 1);
}

#[tokio::test]
async fn server_error_on_proxied_create_is_not_retried() {
    for status in [429, 500, 503] {
        let provider = Arc::new(ScriptedProvider::new().create_status(status));
        let adapter = adapter(&provider);

        let request = ChangeRequest::new(1, "A", "shop", "192.0.2.10").with_proxied(true);
        let err = adapter.apply(&request).await.unwrap_err();

        assert!(
            matches!(err, Error::ProviderRejected { status: s, .. } if s == status),
            "status {status}: {err:?}"
        );
        assert_eq!(provider.creates().len(), 1, "status {status} must not retry");
        assert!(provider.creates()[0].proxied);
    }
}

#[tokio::test]
async fn server_error_on_proxied_create_leaves_row_pending() {
    let provider = Arc::new(ScriptedProvider::new().create_status(503));
    let store = Arc::new(FlakyStore::new(vec![
        ChangeRequest::new(1, "CNAME", "shop", "shops.myshopify.com").with_proxied(true),
    ]));

    let (reconciler, _events) =
        Reconciler::new(store.clone(), adapter(&provider), &ReconcilePolicy::default());
    let report = reconciler.run_once().await.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(provider.creates().len(), 1);
    assert_eq!(store.mark_call_count(), 0);
    assert_eq!(store.inner.is_processed(&RequestId::Int(1)).await, Some(false));
}

#[tokio::test]
async fn mx_txt_ns_are_never_submitted_proxied() {
    let provider = Arc::new(ScriptedProvider::new().rejecting_proxied());
    let adapter = adapter(&provider);

    let requests = [
        ChangeRequest::new(1, "MX", "@", "10 mail.example.com"),
        ChangeRequest::new(2, "TXT", "_dmarc", "v=DMARC1; p=none"),
        ChangeRequest::new(3, "NS", "sub", "ns1.example.net"),
    ];

    for request in requests {
        let request = request.with_proxied(true).with_operation(Operation::Create);
        let applied = adapter.apply(&request).await.unwrap();
        assert!(matches!(
            applied,
            Applied::Created {
                proxied_fallback: false,
                ..
            }
        ));
    }

    let creates = provider.creates();
    assert_eq!(creates.len(), 3, "coerced payloads need no retry");
    assert!(creates.iter().all(|p| !p.proxied));
    assert_eq!(creates[0].priority, Some(10));
    assert_eq!(creates[0].content, "mail.example.com");
    assert_eq!(creates[1].content, "\"v=DMARC1; p=none\"");
}
