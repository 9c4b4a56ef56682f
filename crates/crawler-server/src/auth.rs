use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Bearer-token guard for the admin and crawl routes.
///
/// When `token` is `None` the middleware is a transparent no-op.
#[derive(Clone, Debug, Default)]
pub struct AdminAuth {
    pub token: Option<String>,
}

impl AdminAuth {
    pub fn none() -> Self {
        Self { token: None }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

/// Reject requests that do not carry `Authorization: Bearer <token>`.
/// Local requests are not exempt.
pub async fn admin_auth_middleware(
    State(auth): State<Arc<AdminAuth>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(token) = auth.token.as_deref() else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    if presented == Some(token) {
        return next.run(req).await;
    }

    tracing::warn!(path = %req.uri().path(), "rejected unauthenticated admin request");
    let mut response = Response::new(Body::from(r#"{"error":"unauthorized"}"#));
    *response.status_mut() = axum::http::StatusCode::UNAUTHORIZED;
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("application/json"),
    );
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{http::Request, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    fn test_app(auth: AdminAuth) -> Router {
        Router::new()
            .route("/api/admin/pipeline", get(ok_handler))
            .layer(middleware::from_fn_with_state(
                Arc::new(auth),
                admin_auth_middleware,
            ))
    }

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .uri("/api/admin/pipeline")
            .header("host", "localhost:3141");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn no_token_passes_through() {
        let resp = test_app(AdminAuth::none())
            .oneshot(request(None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_header_is_rejected_even_locally() {
        let resp = test_app(AdminAuth::with_token("s3cret"))
            .oneshot(request(None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let resp = test_app(AdminAuth::with_token("s3cret"))
            .oneshot(request(Some("Bearer nope")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn matching_bearer_token_passes() {
        let resp = test_app(AdminAuth::with_token("s3cret"))
            .oneshot(request(Some("Bearer s3cret")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
