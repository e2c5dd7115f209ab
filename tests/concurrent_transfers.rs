mod common;

use std::sync::Arc;

use axum::http::StatusCode;

use common::{TestApp, dec};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_never_overdraw() {
    let app = Arc::new(TestApp::new().await);
    let token = Arc::new(app.user("john").await);
    let from = app.funded_card(&token, "4111111111111111", "1000.00").await;
    let to = app.funded_card(&token, "5555555555554444", "0.00").await;

    let mut handles = Vec::new();
    for _ in 0..25 {
        let app = app.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            app.transfer(&token, from, to, "100.00").await.0
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => succeeded += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(app.balance(from).await, dec("0.00"));
    assert_eq!(app.balance(to).await, dec("1000.00"));
    assert_eq!(app.store.transaction_count().await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_transfers_conserve_total() {
    let app = Arc::new(TestApp::new().await);
    let token = Arc::new(app.user("john").await);
    let a = app.funded_card(&token, "4111111111111111", "500.00").await;
    let b = app.funded_card(&token, "5555555555554444", "500.00").await;

    let mut handles = Vec::new();
    for i in 0..20 {
        let app = app.clone();
        let token = token.clone();
        let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
        handles.push(tokio::spawn(async move {
            app.transfer(&token, from, to, "25.00").await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    assert_eq!(app.balance(a).await + app.balance(b).await, dec("1000.00"));
    assert_eq!(app.store.transaction_count().await, 20);
}
