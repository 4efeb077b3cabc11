//! Build, serve and teardown behaviour of a whole application.

use std::time::Duration;

use axum::{routing::get, Router};
use web_server::application::BindError;
use web_server::resources::{BackendError, ReleaseOutcome};
use web_server::{Application, ApplicationError, BackendKind, Shutdown};

mod common;

#[tokio::test]
async fn missing_database_parameters_fail_build() {
    let mut settings = common::sqlite_settings();
    settings.database.url = None;

    let err = Application::build(settings).await.unwrap_err();

    match err {
        ApplicationError::Provisioning(e) => {
            assert_eq!(e.backend, BackendKind::Database);
            assert!(matches!(e.source, BackendError::MissingParameter(_)));
        }
        other => panic!("expected provisioning error, got {:?}", other),
    }
}

#[tokio::test]
async fn built_application_uses_configured_port() {
    let mut settings = common::sqlite_settings();
    settings.application.port = 8123;

    let app = Application::build(settings).await.unwrap();

    assert_eq!(app.address(), "0.0.0.0:8123");
    assert_eq!(app.resources().backends(), vec![BackendKind::Database]);
    app.shutdown().await;
}

#[tokio::test]
async fn serves_requests_then_tears_down_once() {
    let app = Application::build(common::sqlite_settings()).await.unwrap();
    let ledger = app.ledger();
    let database = app.resources().database().clone();

    let server = app.bind().await.unwrap();
    let port = server.local_addr().port();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run_until_stopped(shutdown.signalled()));

    let client = common::client();
    let response = client
        .get(format!("http://127.0.0.1:{}/health_check", port))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    let ready = client
        .get(format!("http://127.0.0.1:{}/health/ready", port))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), 200);
    let report: serde_json::Value = ready.json().await.unwrap();
    assert_eq!(report["status"], "ready");

    assert!(ledger.is_empty());
    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();

    assert!(result.is_ok());
    assert_eq!(ledger.count(BackendKind::Database), 1);
    assert_eq!(ledger.records()[0].outcome, ReleaseOutcome::Released);
    assert!(database.is_closed());
}

#[tokio::test]
async fn start_returns_after_shutdown_future_resolves() {
    let app = Application::build(common::sqlite_settings()).await.unwrap();
    let ledger = app.ledger();

    let result = app
        .start_with_shutdown(tokio::time::sleep(Duration::from_millis(100)))
        .await;

    assert!(result.is_ok());
    assert_eq!(ledger.release_order(), vec![BackendKind::Database]);
}

#[tokio::test]
async fn port_in_use_returns_bind_error_and_tears_down() {
    let occupied = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let mut settings = common::sqlite_settings();
    settings.application.port = occupied.local_addr().unwrap().port();

    let app = Application::build(settings).await.unwrap();
    let ledger = app.ledger();
    let database = app.resources().database().clone();

    let err = app
        .start_with_shutdown(std::future::pending())
        .await
        .unwrap_err();

    match err {
        ApplicationError::Bind(BindError { address, .. }) => {
            assert!(address.starts_with("0.0.0.0:"));
        }
        other => panic!("expected bind error, got {:?}", other),
    }
    assert_eq!(ledger.count(BackendKind::Database), 1);
    assert!(database.is_closed());
}

#[tokio::test]
async fn never_started_application_releases_on_shutdown() {
    let app = Application::build(common::sqlite_settings()).await.unwrap();
    let ledger = app.ledger();
    let database = app.resources().database().clone();

    app.shutdown().await;

    assert_eq!(ledger.records().len(), 1);
    assert!(database.is_closed());
}

#[tokio::test]
async fn dropped_application_releases_in_background() {
    let app = Application::build(common::sqlite_settings()).await.unwrap();
    let ledger = app.ledger();

    drop(app);

    assert!(common::wait_until(|| !ledger.is_empty()).await);
    assert_eq!(ledger.count(BackendKind::Database), 1);
}

#[tokio::test]
async fn custom_handler_is_served() {
    let app = Application::builder(common::sqlite_settings())
        .handler(|_settings, resources| {
            let backends = resources.backends().len();
            Router::new().route(
                "/backends",
                get(move || async move { backends.to_string() }),
            )
        })
        .build()
        .await
        .unwrap();

    let server = app.bind().await.unwrap();
    let port = server.local_addr().port();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run_until_stopped(shutdown.signalled()));

    let client = common::client();
    let body = client
        .get(format!("http://127.0.0.1:{}/backends", port))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "1");

    let missing = client
        .get(format!("http://127.0.0.1:{}/health_check", port))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    shutdown.trigger();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn dropped_coordinator_keeps_serving() {
    let app = Application::build(common::sqlite_settings()).await.unwrap();
    let ledger = app.ledger();

    let serving = app.start_with_shutdown(Shutdown::new().signalled());
    let outcome = tokio::time::timeout(Duration::from_millis(300), serving).await;

    assert!(outcome.is_err(), "server stopped without a trigger");
    assert!(ledger.is_empty());
}
