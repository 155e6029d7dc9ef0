use axum::{
    http::{HeaderMap, Method, Uri, Version, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// A resource owned by one request, released when the request finishes.
pub trait Disposable: Send + Sync {
    fn dispose(&self);
}

/// Per-request context, always the first thing an action receives.
///
/// Carries the request line and headers, a slot for a response written by the
/// action itself, and the disposables acquired while handling the request.
/// Disposables are released exactly once, whether the action succeeded or not.
#[derive(Clone)]
pub struct CallContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    request_id: Uuid,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    response: Mutex<Option<Response>>,
    disposables: Mutex<Vec<Arc<dyn Disposable>>>,
}

impl CallContext {
    pub(crate) fn new(parts: &Parts) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                request_id: Uuid::new_v4(),
                method: parts.method.clone(),
                uri: parts.uri.clone(),
                version: parts.version,
                headers: parts.headers.clone(),
                response: Mutex::new(None),
                disposables: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.inner.request_id
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn version(&self) -> Version {
        self.inner.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Write the response directly. Used when the action returns no value.
    pub fn respond(&self, response: impl IntoResponse) {
        let mut slot = self
            .inner
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(response.into_response());
    }

    pub(crate) fn take_response(&self) -> Option<Response> {
        self.inner
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Hand `resource` to the request; it is disposed when the request ends.
    pub fn acquire<D: Disposable + 'static>(&self, resource: D) -> Arc<D> {
        let resource = Arc::new(resource);
        self.inner
            .disposables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(resource.clone());
        resource
    }

    /// Release every acquired resource, in acquisition order. Later calls
    /// find nothing left to release.
    pub(crate) fn dispose(&self) {
        self.inner.dispose_all();
    }
}

impl ContextInner {
    fn dispose_all(&self) {
        let drained: Vec<_> = self
            .disposables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for resource in drained {
            resource.dispose();
        }
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
