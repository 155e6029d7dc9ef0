use crate::interceptor::{Interceptor, InterceptorResult, Next};
use async_trait::async_trait;
use axum::{body::Body, http::Request};
use std::time::Instant;

/// Logs every request passing through a controller or action chain, with
/// its status and how long the rest of the chain took.
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor {
    label: Option<&'static str>,
}

impl LoggingInterceptor {
    /// Tag every line with `label`, usually the controller name.
    pub fn named(label: &'static str) -> Self {
        Self { label: Some(label) }
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let label = self.label.unwrap_or("-");
        let start = Instant::now();

        tracing::info!(label, "--> {} {}", method, uri);

        let outcome = next.run(request).await;
        let elapsed = start.elapsed();
        match &outcome {
            Ok(response) => {
                tracing::info!(label, status = response.status().as_u16(), ?elapsed, "<-- {} {}", method, uri)
            }
            Err(error) => {
                tracing::warn!(label, status = error.status().as_u16(), ?elapsed, "<-- {} {} failed: {}", method, uri, error)
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::HttpException;
    use axum::{http::StatusCode, response::IntoResponse};

    fn request() -> Request<Body> {
        Request::builder().uri("/widgets").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_passes_responses_and_errors_through() {
        let interceptor = LoggingInterceptor::named("WidgetsController");

        let next = Next::new(|_req| Box::pin(async { Ok(StatusCode::ACCEPTED.into_response()) }));
        let response = interceptor.intercept(request(), next).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let next = Next::new(|_req| Box::pin(async { Err(HttpException::not_found("gone")) }));
        let error = interceptor.intercept(request(), next).await.unwrap_err();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }
}
