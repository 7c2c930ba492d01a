//! Load and end-to-end tests for the gateway's bulk path.

use std::time::{Duration, Instant};

use service_client::config::DynamicConfig;

mod common;

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("svc-{}", i)).collect()
}

#[tokio::test]
async fn test_bulk_load_respects_parallelism() {
    let downstream = common::start_programmable_downstream(Duration::from_millis(20), |req| {
        (200, common::service_body(&common::service_id_of(req)))
    })
    .await;
    let gateway = common::start_gateway(
        common::test_config(&downstream.url()),
        DynamicConfig {
            number_of_parallel_requests: 4,
            number_of_steps: 3,
        },
    )
    .await;

    let start = Instant::now();
    let body: serde_json::Value = reqwest::Client::new()
        .post(gateway.url("/api/v1/services/bulk"))
        .json(&serde_json::json!({ "serviceIds": ids(60) }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    println!("Bulk of 60 finished in {:?}, peak concurrency {}", elapsed, downstream.peak_concurrency());

    assert_eq!(body["summary"]["totalRequests"], 60);
    assert_eq!(body["summary"]["successfulCount"], 60);
    assert!(body.get("data").is_none(), "results only when asked for");
    assert_eq!(downstream.hits(), 60);
    assert!(downstream.peak_concurrency() <= 4, "peak was {}", downstream.peak_concurrency());

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_reloaded_parallelism_applies_to_next_run() {
    let downstream = common::start_programmable_downstream(Duration::from_millis(20), |req| {
        (200, common::service_body(&common::service_id_of(req)))
    })
    .await;
    let gateway = common::start_gateway(
        common::test_config(&downstream.url()),
        DynamicConfig {
            number_of_parallel_requests: 1,
            number_of_steps: 1,
        },
    )
    .await;
    let http = reqwest::Client::new();

    let res = http
        .post(gateway.url("/api/v1/services/bulk"))
        .json(&serde_json::json!({ "serviceIds": ids(6) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(downstream.peak_concurrency(), 1);

    gateway.dynamic.store(std::sync::Arc::new(DynamicConfig {
        number_of_parallel_requests: 6,
        number_of_steps: 1,
    }));

    let res = http
        .post(gateway.url("/api/v1/services/bulk"))
        .json(&serde_json::json!({ "serviceIds": ids(6) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(downstream.peak_concurrency() > 1, "new parallelism should allow overlap");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_bulk_deadline_fails_outstanding_items() {
    let downstream = common::start_programmable_downstream(Duration::from_secs(10), |req| {
        (200, common::service_body(&common::service_id_of(req)))
    })
    .await;
    let mut config = common::test_config(&downstream.url());
    config.bulk.deadline_secs = 1;
    let gateway = common::start_gateway(config, DynamicConfig::default()).await;

    let start = Instant::now();
    let body: serde_json::Value = reqwest::Client::new()
        .post(gateway.url("/api/v1/services/bulk?includeResults=true"))
        .json(&serde_json::json!({ "serviceIds": ["a", "b"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(body["summary"]["failedCount"], 2);
    assert_eq!(body["data"][0]["error"], "request cancelled");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_single_id_and_empty_bulk() {
    let downstream = common::start_programmable_downstream(Duration::ZERO, |req| {
        (200, common::service_body(&common::service_id_of(req)))
    })
    .await;
    let gateway = common::start_gateway(common::test_config(&downstream.url()), DynamicConfig::default()).await;
    let http = reqwest::Client::new();

    let single: serde_json::Value = http
        .post(gateway.url("/api/v1/services/bulk?includeResults=true"))
        .json(&serde_json::json!({ "serviceId": "only" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(single["summary"]["totalRequests"], 1);
    assert_eq!(single["data"][0]["data"]["id"], "only");

    let empty: serde_json::Value = http
        .post(gateway.url("/api/v1/services/bulk"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty["summary"]["totalRequests"], 0);
    assert_eq!(downstream.hits(), 1, "empty bulk makes no downstream calls");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_create_and_probe_endpoints() {
    let downstream = common::start_programmable_downstream(Duration::ZERO, |_| {
        (201, common::service_body("created-1"))
    })
    .await;
    let gateway = common::start_gateway(common::test_config(&downstream.url()), DynamicConfig::default()).await;
    let http = reqwest::Client::new();

    let res = http
        .post(gateway.url("/api/v1/services"))
        .header("x-request-id", "trace-me")
        .json(&serde_json::json!({
            "resources": [{ "id": "r-1", "owners": [{ "id": "o-1", "name": "Ops", "accountNumber": "A1", "level": 1 }] }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    assert_eq!(res.headers()["x-request-id"], "trace-me");
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["data"]["id"], "created-1");

    let invalid = http
        .post(gateway.url("/api/v1/services"))
        .json(&serde_json::json!({ "resources": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), 400);
    assert!(invalid.headers().contains_key("x-request-id"));
    assert_eq!(downstream.hits(), 1);

    assert_eq!(http.get(gateway.url("/live")).send().await.unwrap().status(), 200);
    assert_eq!(http.get(gateway.url("/ready")).send().await.unwrap().status(), 200);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_oversized_and_malformed_bodies_are_rejected() {
    let downstream = common::start_programmable_downstream(Duration::ZERO, |req| {
        (200, common::service_body(&common::service_id_of(req)))
    })
    .await;
    let mut config = common::test_config(&downstream.url());
    config.server.max_body_bytes = 64;
    let gateway = common::start_gateway(config, DynamicConfig::default()).await;
    let http = reqwest::Client::new();

    let oversized = http
        .post(gateway.url("/api/v1/services/bulk"))
        .json(&serde_json::json!({ "serviceIds": ids(50) }))
        .send()
        .await
        .unwrap();
    assert_eq!(oversized.status(), 413);
    assert!(oversized.headers().contains_key("x-request-id"));
    let body: serde_json::Value = oversized.json().await.unwrap();
    assert!(body["error"].is_string());

    let not_json = http
        .post(gateway.url("/api/v1/services/bulk"))
        .body("serviceId=a")
        .send()
        .await
        .unwrap();
    assert_eq!(not_json.status(), 415);

    let small = http
        .post(gateway.url("/api/v1/services/bulk"))
        .json(&serde_json::json!({ "serviceId": "a" }))
        .send()
        .await
        .unwrap();
    assert_eq!(small.status(), 200);
    assert_eq!(downstream.hits(), 1, "rejected bodies never reach the downstream");

    gateway.shutdown.trigger();
}
