use crate::config::Environment;
use crate::exception::{ArgumentsHost, ExceptionFilter, FilterChain, HttpException};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The filter every chain ends in.
///
/// Unauthorized errors always answer with a bare 401. In production every
/// other error answers with a bare status code; in development the message is
/// included (`HttpError` as text, anything else as a JSON payload carrying the
/// error's debug rendering as `stack`).
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpExceptionFilter {
    environment: Environment,
}

impl HttpExceptionFilter {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn respond(&self, error: HttpException, host: &ArgumentsHost) -> Response {
        let status = error.status();

        if let HttpException::Unauthorized(reason) = &error {
            tracing::debug!("{} {} unauthorized: {}", host.method(), host.uri(), reason);
            return StatusCode::UNAUTHORIZED.into_response();
        }

        tracing::error!(
            error = %error,
            kind = error.name(),
            status = status.as_u16(),
            "{} {} failed",
            host.method(),
            host.uri()
        );

        if !self.environment.is_development() {
            return status.into_response();
        }

        match &error {
            HttpException::Http { message, .. } => (status, message.clone()).into_response(),
            _ => (
                status,
                Json(json!({
                    "name": error.name(),
                    "message": format!("{:#}", DisplayChain(&error)),
                    "stack": stack(&error),
                    "statusCode": status.as_u16(),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
                .into_response(),
        }
    }
}

impl ExceptionFilter for HttpExceptionFilter {
    fn catch(&self, error: HttpException, host: &ArgumentsHost, _next: FilterChain<'_>) -> Response {
        self.respond(error, host)
    }
}

/// Debug rendering of the error. For wrapped errors this is the anyhow
/// report: the cause chain, plus a backtrace when one was captured.
fn stack(error: &HttpException) -> String {
    match error {
        HttpException::Other(inner) => format!("{inner:?}"),
        other => format!("{other:?}"),
    }
}

struct DisplayChain<'a>(&'a HttpException);

impl std::fmt::Display for DisplayChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            HttpException::Other(inner) => write!(f, "{inner:#}"),
            other => write!(f, "{other}"),
        }
    }
}

/// Answers every request that no controller route matched.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};

    fn host() -> ArgumentsHost {
        let request = Request::builder().uri("/widgets").body(Body::empty()).unwrap();
        ArgumentsHost::from_request(&request)
    }

    async fn body_of(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_production_returns_bare_status() {
        let filter = HttpExceptionFilter::new(Environment::Production);
        let response = filter.respond(HttpException::other(anyhow::anyhow!("boom")), &host());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_development_returns_payload() {
        let filter = HttpExceptionFilter::new(Environment::Development);
        let response = filter.respond(HttpException::other(anyhow::anyhow!("boom")), &host());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let payload: serde_json::Value = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(payload["name"], "Error");
        assert_eq!(payload["message"], "boom");
        assert_eq!(payload["statusCode"], 500);
        assert!(payload["stack"].as_str().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_development_stack_lists_causes() {
        let filter = HttpExceptionFilter::new(Environment::Development);
        let error = anyhow::anyhow!("connection refused").context("loading widgets");
        let response = filter.respond(HttpException::other(error), &host());

        let payload: serde_json::Value = serde_json::from_slice(&body_of(response).await).unwrap();
        let stack = payload["stack"].as_str().unwrap();
        assert!(stack.contains("loading widgets"));
        assert!(stack.contains("Caused by"));
        assert!(stack.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_http_error_message_in_development() {
        let filter = HttpExceptionFilter::new(Environment::Development);
        let response = filter.respond(HttpException::not_found("no such widget"), &host());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, b"no such widget");
    }

    #[tokio::test]
    async fn test_unauthorized_is_bare_401_in_every_mode() {
        for environment in [Environment::Production, Environment::Development] {
            let filter = HttpExceptionFilter::new(environment);
            let response = filter.respond(HttpException::unauthorized("token expired"), &host());
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert!(body_of(response).await.is_empty());
        }
    }
}
