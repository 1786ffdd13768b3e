use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::state::AppState;
use crate::{auth, budgets, categories, dashboard, purchases};

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "OK",
        timestamp: OffsetDateTime::now_utc(),
    })
}

async fn route_not_found() -> AppError {
    AppError::NotFound("route")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    Router::new()
        .route("/health", get(health))
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(categories::router())
                .merge(purchases::router())
                .merge(budgets::router())
                .merge(dashboard::router()),
        )
        .fallback(route_not_found)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Binds `APP_HOST:APP_PORT`; the host may be a name or an IPv4/IPv6 literal.
pub async fn bind(config: &AppConfig) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("bind {}:{}", config.host, config.port))?;
    info!("listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Serves until SIGINT/SIGTERM, then lets in-flight requests finish.
pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let listener = bind(config).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        app.clone().oneshot(req).await.unwrap()
    }

    async fn register(app: &Router, email: &str) -> (String, String) {
        let resp = send(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": email, "password": "password123", "displayName": "A"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        let tokens = &body["data"]["tokens"];
        (
            tokens["accessToken"].as_str().unwrap().to_string(),
            tokens["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn binds_to_a_host_name() {
        let mut config = (*AppState::fake().config).clone();
        config.host = "localhost".into();
        config.port = 0;
        let listener = bind(&config).await.expect("bind localhost");
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let resp = send(&app, "GET", "/health", None, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "OK");
    }

    #[tokio::test]
    async fn unknown_route_uses_error_envelope() {
        let app = build_app(AppState::fake());
        let resp = send(&app, "GET", "/api/nope", None, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "NotFound");
    }

    #[tokio::test]
    async fn register_login_me_flow() {
        let app = build_app(AppState::fake());
        let (access, _) = register(&app, "a@x.com").await;

        let resp = send(&app, "GET", "/api/auth/me", Some(&access), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["user"]["email"], "a@x.com");
        assert!(body["data"]["user"].get("passwordHash").is_none());

        let resp = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "a@x.com", "password": "password123"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["success"], true);
    }

    #[tokio::test]
    async fn error_kinds_and_statuses_reach_the_client() {
        let app = build_app(AppState::fake());
        register(&app, "a@x.com").await;

        let resp = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "a@x.com", "password": "password123", "displayName": "A"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["error"]["kind"], "DuplicateEmail");

        let resp = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "invalid-email", "password": "123", "displayName": "A"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["kind"], "ValidationError");
        assert_eq!(body["error"]["fields"].as_array().unwrap().len(), 2);

        let resp = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "a@x.com", "password": "wrongpassword"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"]["kind"], "InvalidCredentials");

        let resp = send(&app, "GET", "/api/auth/me", None, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"]["kind"], "MissingToken");

        let resp = send(&app, "GET", "/api/auth/me", Some("garbage"), None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"]["kind"], "Unauthorized");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["kind"], "ValidationError");
    }

    #[tokio::test]
    async fn refresh_rotates_and_logout_revokes() {
        let app = build_app(AppState::fake());
        let (_, refresh) = register(&app, "a@x.com").await;

        let resp = send(&app, "POST", "/api/auth/refresh", None, Some(json!({"refreshToken": refresh}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let next = body_json(resp).await["data"]["tokens"]["refreshToken"]
            .as_str()
            .unwrap()
            .to_string();

        let resp = send(&app, "POST", "/api/auth/refresh", None, Some(json!({"refreshToken": refresh}))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"]["kind"], "InvalidOrExpiredToken");

        let resp = send(&app, "POST", "/api/auth/logout", None, Some(json!({"refreshToken": next}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = send(&app, "POST", "/api/auth/logout", None, None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, "POST", "/api/auth/refresh", None, Some(json!({"refreshToken": next}))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn records_are_isolated_between_users() {
        let app = build_app(AppState::fake());
        let (alice, _) = register(&app, "a@x.com").await;
        let (bob, _) = register(&app, "b@x.com").await;

        let resp = send(&app, "POST", "/api/categories", Some(&alice), Some(json!({"name": "Food"}))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["category"]["color"], "#1976d2");
        let id = body["data"]["category"]["id"].as_str().unwrap().to_string();

        let resp = send(&app, "GET", &format!("/api/categories/{id}"), Some(&bob), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"]["kind"], "NotFound");

        let resp = send(&app, "GET", &format!("/api/categories/{id}"), Some(&alice), None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, "POST", "/api/categories", Some(&alice), Some(json!({"name": "Food"}))).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = send(
            &app,
            "POST",
            "/api/purchases",
            Some(&bob),
            Some(json!({
                "categoryId": id,
                "date": "2024-03-01",
                "amount": 10.0,
                "establishment": "Shop",
                "paymentMethod": "card"
            })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["fields"][0]["field"], "categoryId");
    }

    #[tokio::test]
    async fn purchases_list_carries_pagination() {
        let app = build_app(AppState::fake());
        let (token, _) = register(&app, "a@x.com").await;
        let resp = send(&app, "POST", "/api/categories", Some(&token), Some(json!({"name": "Food"}))).await;
        let category = body_json(resp).await["data"]["category"]["id"].clone();

        for day in 1..=3 {
            let resp = send(
                &app,
                "POST",
                "/api/purchases",
                Some(&token),
                Some(json!({
                    "categoryId": category,
                    "date": format!("2024-03-0{day}T10:00:00Z"),
                    "amount": 5.0,
                    "establishment": "Shop",
                    "paymentMethod": "cash"
                })),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let resp = send(&app, "GET", "/api/purchases?page=2&limit=2", Some(&token), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(
            body["data"]["pagination"],
            json!({"page": 2, "limit": 2, "total": 3, "pages": 2})
        );

        let resp = send(&app, "GET", "/api/purchases?limit=abc", Some(&token), None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&app, "GET", "/api/dashboard/stats?month=2024-03", Some(&token), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["monthlyTotal"], 15.0);
        assert_eq!(body["data"]["expensesByCategory"][0]["count"], 3);
    }

    #[tokio::test]
    async fn page_past_the_offset_range_is_rejected() {
        let app = build_app(AppState::fake());
        let (token, _) = register(&app, "a@x.com").await;
        for list in ["/api/purchases", "/api/budgets"] {
            let uri = format!("{list}?page={}&limit=100", i64::MAX);
            let resp = send(&app, "GET", &uri, Some(&token), None).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body = body_json(resp).await;
            assert_eq!(body["error"]["kind"], "ValidationError");
            assert_eq!(body["error"]["fields"][0]["field"], "page");
        }
    }

    #[tokio::test]
    async fn malformed_id_is_rejected_with_envelope() {
        let app = build_app(AppState::fake());
        let (token, _) = register(&app, "a@x.com").await;
        let resp = send(&app, "GET", "/api/budgets/not-a-uuid", Some(&token), None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["success"], false);
    }
}
