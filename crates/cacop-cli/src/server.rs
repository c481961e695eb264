//! HTTP service.
//!
//! `POST /?subject=<url>` verifies the subject's chain against the PEM trust
//! anchor in the request body. `GET|POST /bundledCA?subject=<url>` verifies
//! the chain exactly as the subject presents it. Both answer with the JSON
//! [`SubjectReport`](cacop::SubjectReport).

use anyhow::{Context as _, Result};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::service::{Service, ServiceError};

#[derive(Debug, Deserialize)]
struct SubjectQuery {
    subject: Option<String>,
}

/// Build the router.
pub fn router(service: Arc<Service>) -> Router {
    Router::new()
        .route("/", post(check))
        .route("/bundledCA", get(bundled).post(bundled))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Listen on `bind` until interrupted.
pub async fn serve(bind: SocketAddr, service: Arc<Service>) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

async fn check(
    State(service): State<Arc<Service>>,
    Query(query): Query<SubjectQuery>,
    body: Bytes,
) -> Response {
    let Some(subject) = query.subject else {
        return missing_subject();
    };
    match service.check(&subject, &body).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => failure(&subject, &e),
    }
}

async fn bundled(State(service): State<Arc<Service>>, Query(query): Query<SubjectQuery>) -> Response {
    let Some(subject) = query.subject else {
        return missing_subject();
    };
    match service.bundled(&subject).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => failure(&subject, &e),
    }
}

fn missing_subject() -> Response {
    (
        StatusCode::BAD_REQUEST,
        "'subject' query parameter is required\n",
    )
        .into_response()
}

fn failure(subject: &str, error: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warn!(subject, status = status.as_u16(), error = %error, "request failed");
    (status, format!("{error}\n")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::{service, EchoValidator, StaticSource};
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use cacop_core::testing::TestPki;
    use tower::ServiceExt;

    async fn call(
        service: Service,
        method: Method,
        uri: &str,
        body: impl Into<Body>,
    ) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body.into())
            .unwrap();
        let response = router(Arc::new(service)).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn missing_subject_is_rejected() {
        let pki = TestPki::new();
        for (method, uri) in [(Method::POST, "/"), (Method::GET, "/bundledCA")] {
            let (status, body) = call(
                service(StaticSource(Some(pki.chain()))),
                method,
                uri,
                pki.root.pem(),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(String::from_utf8(body).unwrap().contains("'subject'"));
        }
    }

    #[tokio::test]
    async fn malformed_anchor_is_rejected() {
        let (status, _) = call(
            service(StaticSource(Some(TestPki::new().chain()))),
            Method::POST,
            "/?subject=https://subject.example.test",
            "definitely not PEM",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_subject_is_rejected() {
        let (status, body) = call(
            service(StaticSource(None)),
            Method::GET,
            "/bundledCA?subject=https://down.example.test",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().contains("down.example.test"));
    }

    #[tokio::test]
    async fn anchor_route_returns_report() {
        let pki = TestPki::new();
        let (status, body) = call(
            service(StaticSource(Some(pki.chain()))),
            Method::POST,
            "/?subject=https://subject.example.test",
            pki.root.pem(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["subject_url"], "https://subject.example.test");
        assert_eq!(
            json["chain"]["leaf"]["fingerprint"],
            pki.leaf.certificate().fingerprint()
        );
        assert_eq!(
            json["chain"]["root"]["fingerprint"],
            pki.root.certificate().fingerprint()
        );
        assert!(json["validation"].is_null());
    }

    #[tokio::test]
    async fn bundled_route_accepts_get_and_post() {
        let pki = TestPki::new();
        for method in [Method::GET, Method::POST] {
            let service =
                service(StaticSource(Some(pki.chain()))).with_validator(Arc::new(EchoValidator));
            let (status, body) = call(
                service,
                method,
                "/bundledCA?subject=https://subject.example.test",
                Body::empty(),
            )
            .await;
            assert_eq!(status, StatusCode::OK);

            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["chain"]["intermediates"].as_array().unwrap().len(), 1);
            assert_eq!(json["validation"]["valid"], true);
        }
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _) = call(
            service(StaticSource(None)),
            Method::GET,
            "/status",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
