//! REST collaborator tests against a mock cluster API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cluster_health::acquire::{fetch_metadata, SnapshotAcquirer};
use cluster_health::{AcquisitionError, ClusterConnector, NodeStatus, RestConnector};

fn connector(base_url: &str) -> RestConnector {
    RestConnector::new(base_url, "admin", "secret", Duration::from_secs(5), true).unwrap()
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/session/login"))
        .and(body_json(json!({"username": "admin", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bearer_token": "tok-1"})))
        .mount(server)
        .await;
}

async fn mount_get(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_acquire_and_metadata() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_get(
        &server,
        "/v1/cluster/nodes/",
        json!([{
            "id": 1, "node_status": "offline", "node_name": "music-1", "uuid": "n-1",
            "label": "", "model_number": "QVIRT", "serial_number": null
        }]),
    )
    .await;
    mount_get(
        &server,
        "/v1/cluster/slots/",
        json!([{
            "id": "1.1", "node_id": 1, "slot": 1, "state": "healthy",
            "slot_type": "SSD", "disk_type": "SSD", "disk_model": "Virtual_disk",
            "disk_serial_number": "1234", "capacity": "10467934208", "led_pattern": "LED_PATTERN_NORMAL"
        }]),
    )
    .await;
    mount_get(&server, "/v1/cluster/settings", json!({"cluster_name": "CoffeeTime"})).await;
    mount_get(&server, "/v1/node/state", json!({"cluster_id": "c0ffee-0001", "node_id": 1})).await;
    mount_get(&server, "/v1/time/status", json!({"time": "2026-10-17T04:00:00Z"})).await;
    mount_get(&server, "/v1/version", json!({"revision_id": "7.2.0"})).await;

    let acquirer = SnapshotAcquirer::new(Box::new(connector(&server.uri())));
    let acquisition = acquirer.acquire().await.unwrap();

    assert_eq!(acquisition.snapshot.nodes.len(), 1);
    assert_eq!(acquisition.snapshot.nodes[0].status, NodeStatus::Offline);
    assert_eq!(acquisition.snapshot.nodes[0].serial, "");
    assert_eq!(acquisition.snapshot.drives[0].disk_serial, "1234");

    let metadata = fetch_metadata(acquisition.session.as_ref()).await.unwrap();
    assert_eq!(metadata.name, "CoffeeTime");
    assert_eq!(metadata.uuid, "c0ffee-0001");
    assert_eq!(metadata.time, "2026-10-17T04:00:00Z");
    assert_eq!(metadata.version, "7.2.0");
}

#[tokio::test]
async fn test_rejected_login_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/session/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let err = connector(&server.uri()).connect().await.err().unwrap();
    assert!(matches!(err, AcquisitionError::Auth(_)), "{err:?}");
}

#[tokio::test]
async fn test_server_error_is_query_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/cluster/nodes/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let acquirer = SnapshotAcquirer::new(Box::new(connector(&server.uri())));
    let err = acquirer.acquire().await.err().unwrap();

    match err {
        AcquisitionError::Query { query, reason } => {
            assert_eq!(query, "/v1/cluster/nodes/");
            assert!(reason.contains("500"), "{reason}");
        }
        other => panic!("expected Query, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_array_listing_is_query_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_get(&server, "/v1/cluster/nodes/", json!({"entries": []})).await;

    let acquirer = SnapshotAcquirer::new(Box::new(connector(&server.uri())));
    let err = acquirer.acquire().await.err().unwrap();
    assert!(matches!(err, AcquisitionError::Query { .. }), "{err:?}");
}

#[tokio::test]
async fn test_closed_port_is_connect_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = connector(&format!("http://127.0.0.1:{port}"))
        .connect()
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AcquisitionError::Connect { .. }), "{err:?}");
}

#[tokio::test]
async fn test_slow_login_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/session/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"bearer_token": "tok-1"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let connector =
        RestConnector::new(&server.uri(), "admin", "secret", Duration::from_millis(200), true)
            .unwrap();
    let err = connector.connect().await.err().unwrap();

    match err {
        AcquisitionError::Timeout { query } => assert_eq!(query, "login"),
        other => panic!("expected Timeout, got {other:?}"),
    }
}
