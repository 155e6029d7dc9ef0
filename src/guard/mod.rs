use crate::exception::HttpException;
use crate::interceptor::{Interceptor, InterceptorResult, Next};
use async_trait::async_trait;
use axum::{body::Body, http::Request, http::StatusCode};

/// Standard Result type for Guard
/// Ok(()) means allowed
/// Err(GuardError) means denied
pub type GuardResult = Result<(), GuardError>;

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl From<GuardError> for HttpException {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Forbidden(reason) => HttpException::new(StatusCode::FORBIDDEN, reason),
            GuardError::Unauthorized(reason) => HttpException::Unauthorized(reason),
        }
    }
}

/// The Guard trait
/// Implement this to protect routes
#[async_trait]
pub trait Guard: Send + Sync + 'static {
    async fn can_activate(&self, request: &Request<Body>) -> GuardResult;
}

/// Runs a guard as an interceptor, so it can sit in any controller or action
/// chain. A denied request never reaches the rest of the chain.
pub struct Guarded<G>(pub G);

#[async_trait]
impl<G: Guard> Interceptor for Guarded<G> {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
        self.0.can_activate(&request).await?;
        next.run(request).await
    }
}
