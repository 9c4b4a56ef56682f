use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crawler_core::CrawlError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(CrawlError::Validation(msg.into()).into())
    }

    /// Construct a 409 Conflict error for a step requested while the
    /// pipeline loop owns the queue.
    pub fn busy() -> Self {
        Self(CrawlError::PipelineBusy.into())
    }
}

fn status_for(e: &CrawlError) -> StatusCode {
    match e {
        CrawlError::NotInitialized
        | CrawlError::Validation(_)
        | CrawlError::UnknownRegion(_) => StatusCode::BAD_REQUEST,
        CrawlError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
        CrawlError::DuplicateIdentifier(_) | CrawlError::PipelineBusy => StatusCode::CONFLICT,
        CrawlError::Configuration(_) | CrawlError::PipelineUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CrawlError::External(_) => StatusCode::BAD_GATEWAY,
        CrawlError::Db(_) | CrawlError::Io(_) | CrawlError::Yaml(_) | CrawlError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<CrawlError>() {
            Some(e) => status_for(e),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let response = AppError::bad_request("invalid action").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_region_maps_to_400() {
        let err = AppError(CrawlError::UnknownRegion("moon1".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_credential_maps_to_503() {
        let err = AppError(
            CrawlError::Configuration("RIOT_API_KEY is not configured".into()).into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn busy_maps_to_409() {
        assert_eq!(AppError::busy().into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn duplicate_maps_to_409() {
        let err = AppError(CrawlError::DuplicateIdentifier("p1".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn player_not_found_maps_to_404() {
        let err = AppError(CrawlError::PlayerNotFound("p1".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn external_maps_to_502() {
        let err = AppError(CrawlError::External("riot down".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn db_error_maps_to_500() {
        let err = AppError(CrawlError::Db("corrupt page".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn foreign_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError::bad_request("nope").into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
