use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use slipway_core::SlipwayError;

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<SlipwayError>() {
            match e {
                SlipwayError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
                SlipwayError::ServiceExists(_) => StatusCode::CONFLICT,
                SlipwayError::InvalidServiceName(_) | SlipwayError::InvalidConfiguration(_) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

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
    fn not_found_maps_to_404() {
        let err = AppError(SlipwayError::ServiceNotFound("x".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn exists_maps_to_409() {
        let err = AppError(SlipwayError::ServiceExists("x".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let err = AppError(SlipwayError::InvalidConfiguration("two variants".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        let err = AppError(SlipwayError::InvalidServiceName("BAD".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn transient_errors_map_to_500() {
        let err = AppError(SlipwayError::NoReleaseTag.into());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
