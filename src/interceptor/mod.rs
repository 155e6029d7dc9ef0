use crate::exception::HttpException;
use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use futures::future::BoxFuture;

pub mod layer;
pub mod logging;

pub use layer::InterceptorLayer;
pub use logging::LoggingInterceptor;

/// standard return type for Interceptors
pub type InterceptorResult = Result<Response, HttpException>;

/// Represents the next handler in the chain
pub struct Next {
    pub(crate) run: Box<dyn FnOnce(Request<Body>) -> BoxFuture<'static, InterceptorResult> + Send>,
}

impl Next {
    /// Create a new Next handler
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> BoxFuture<'static, InterceptorResult> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the next handler
    pub async fn run(self, request: Request<Body>) -> InterceptorResult {
        (self.run)(request).await
    }
}

/// The Interceptor trait
///
/// Interceptors can inspect/modify the request before it reaches the handler,
/// and inspect/modify the response after the handler returns. Returning an
/// error short-circuits the chain; the error goes through the exception
/// filters like any other request-time failure.
///
/// Chains run in declaration order: the first interceptor declared on a
/// controller or action is the outermost one.
///
/// # Example
/// ```
/// use arbor::interceptor::{Interceptor, InterceptorResult, Next};
/// use async_trait::async_trait;
/// use axum::{body::Body, http::Request};
///
/// struct TimingInterceptor;
///
/// #[async_trait]
/// impl Interceptor for TimingInterceptor {
///     async fn intercept(&self, req: Request<Body>, next: Next) -> InterceptorResult {
///         let start = std::time::Instant::now();
///         let res = next.run(req).await?;
///         tracing::debug!(elapsed = ?start.elapsed(), "handled");
///         Ok(res)
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult;
}
