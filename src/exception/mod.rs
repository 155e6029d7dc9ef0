use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, Uri, request::Parts},
    response::Response,
};
use std::sync::Arc;
use thiserror::Error;

pub mod http;

pub use http::{HttpExceptionFilter, not_found};

/// Errors raised while a request is being handled.
///
/// Anything returned from an action, an interceptor or the parameter binder
/// ends up here and is turned into a response by the exception filter chain.
#[derive(Debug, Error)]
pub enum HttpException {
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Cannot bind parameter: {0}")]
    Binding(String),

    #[error("Cannot render view `{view}`: {message}")]
    View { view: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HttpException {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Wrap any error as a generic failure.
    pub fn other(error: impl Into<anyhow::Error>) -> Self {
        Self::Other(error.into())
    }

    /// Error class name reported in development payloads.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Http { .. } => "HttpError",
            Self::Unauthorized(_) => "UnauthorizedError",
            Self::Binding(_) => "BindingError",
            Self::View { .. } => "ViewError",
            Self::Other(_) => "Error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http { status, .. } => *status,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Binding(_) => StatusCode::BAD_REQUEST,
            Self::View { .. } | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for HttpException {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(err.into())
    }
}

/// Request data available to exception filters.
#[derive(Debug, Clone)]
pub struct ArgumentsHost {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl ArgumentsHost {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }

    pub fn from_request(request: &Request<Body>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// The ExceptionFilter trait
///
/// Filters handle errors thrown during request processing. A filter either
/// answers with its own response or hands the error to the rest of the chain.
///
/// ```
/// use arbor::exception::{ArgumentsHost, ExceptionFilter, FilterChain, HttpException};
/// use axum::{http::StatusCode, response::{IntoResponse, Response}};
///
/// struct Teapot;
///
/// impl ExceptionFilter for Teapot {
///     fn catch(&self, error: HttpException, host: &ArgumentsHost, next: FilterChain<'_>) -> Response {
///         if host.uri().path() == "/coffee" {
///             return StatusCode::IM_A_TEAPOT.into_response();
///         }
///         next.next(error, host)
///     }
/// }
/// ```
pub trait ExceptionFilter: Send + Sync + 'static {
    fn catch(&self, error: HttpException, host: &ArgumentsHost, next: FilterChain<'_>) -> Response;
}

/// The remaining filters after the current one, ending in the default filter.
pub struct FilterChain<'a> {
    rest: &'a [Arc<dyn ExceptionFilter>],
    fallback: &'a HttpExceptionFilter,
}

impl FilterChain<'_> {
    /// Delegate to the next filter in line.
    pub fn next(self, error: HttpException, host: &ArgumentsHost) -> Response {
        match self.rest.split_first() {
            Some((filter, rest)) => filter.catch(
                error,
                host,
                FilterChain {
                    rest,
                    fallback: self.fallback,
                },
            ),
            None => self.fallback.respond(error, host),
        }
    }
}

/// Registered filters plus the terminating default, shared by every route.
pub(crate) struct FilterStack {
    filters: Vec<Arc<dyn ExceptionFilter>>,
    fallback: HttpExceptionFilter,
}

impl FilterStack {
    pub(crate) fn new(filters: Vec<Arc<dyn ExceptionFilter>>, fallback: HttpExceptionFilter) -> Self {
        Self { filters, fallback }
    }

    pub(crate) fn handle(&self, error: HttpException, host: &ArgumentsHost) -> Response {
        FilterChain {
            rest: &self.filters,
            fallback: &self.fallback,
        }
        .next(error, host)
    }
}
