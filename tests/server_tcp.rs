//! A real TCP round trip through `HttpServer::run`.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use api_telemetry::http::{HttpServer, X_REQUEST_ID};
use api_telemetry::lifecycle::Shutdown;
use api_telemetry::observability::Channel;

mod common;
use common::{brief_lines, eventually, trace_documents, TestLogger};

#[tokio::test]
async fn test_serves_and_logs_over_tcp() {
    let logger = TestLogger::start("BF.RF").await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(logger.config(), logger.router.clone());
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/status", addr))
        .header("cookie", "session=abc")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let request_id = response
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(uuid::Uuid::parse_str(&request_id).is_ok());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let brief_file = logger.today_file(Channel::Brief);
    let request_file = logger.today_file(Channel::Request);
    let logged = eventually(Duration::from_secs(5), || {
        let brief = std::fs::read_to_string(&brief_file)
            .map(|t| !brief_lines(&t).is_empty())
            .unwrap_or(false);
        let traced = std::fs::read_to_string(&request_file)
            .map(|t| t.contains("#--# "))
            .unwrap_or(false);
        brief && traced
    })
    .await;
    assert!(logged, "brief line or request trace never written");

    let brief = brief_lines(&logger.read_today(Channel::Brief).await);
    assert_eq!(brief.len(), 1);
    assert!(brief[0].contains("GET /status 200 - 127.0.0.1 - "), "{}", brief[0]);

    let docs = trace_documents(&logger.read_today(Channel::Request).await);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["ID"].as_str(), Some(request_id.as_str()));
    assert_eq!(
        docs[0]["RESPONSE"]["HEADERS"]["x-request-id"].as_str(),
        Some(request_id.as_str())
    );
    assert_eq!(docs[0]["REQUEST"]["IP"].as_str(), Some("127.0.0.1"));
    assert_eq!(docs[0]["REQUEST"]["COOKIES"]["session"].as_str(), Some("abc"));
    assert_eq!(docs[0]["RESPONSE"]["DATA"]["status"].as_str(), Some("ok"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
