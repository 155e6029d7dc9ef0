use crate::exception::{ArgumentsHost, FilterStack};
use crate::interceptor::{Interceptor, Next};
use axum::{body::Body, http::Request, response::Response};
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower Layer running an ordered chain of interceptors in front of a route.
///
/// Errors returned by the chain are answered by the exception filters, so the
/// wrapped service stays infallible as axum requires.
#[derive(Clone)]
pub struct InterceptorLayer {
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
    filters: Arc<FilterStack>,
}

impl InterceptorLayer {
    pub(crate) fn new(interceptors: Vec<Arc<dyn Interceptor>>, filters: Arc<FilterStack>) -> Self {
        Self {
            interceptors: Arc::new(interceptors),
            filters,
        }
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorMiddleware {
            inner,
            interceptors: Arc::clone(&self.interceptors),
            filters: Arc::clone(&self.filters),
        }
    }
}

#[derive(Clone)]
pub struct InterceptorMiddleware<S> {
    inner: S,
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
    filters: Arc<FilterStack>,
}

impl<S> Service<Request<Body>> for InterceptorMiddleware<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let interceptors = Arc::clone(&self.interceptors);
        let filters = Arc::clone(&self.filters);

        // The clone may not be ready; keep the one poll_ready was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let host = ArgumentsHost::from_request(&request);

            let mut chain = Next::new(move |req| {
                Box::pin(async move {
                    match inner.call(req).await {
                        Ok(response) => Ok(response),
                        Err(never) => match never {},
                    }
                })
            });

            // interceptors[0] wraps (interceptors[1] wraps ... (inner))
            for i in (0..interceptors.len()).rev() {
                let interceptors = Arc::clone(&interceptors);
                let next_chain = chain;

                chain = Next::new(move |req| {
                    Box::pin(async move {
                        let interceptor = &interceptors[i];
                        interceptor.intercept(req, next_chain).await
                    })
                });
            }

            Ok(match chain.run(request).await {
                Ok(response) => response,
                Err(error) => filters.handle(error, &host),
            })
        })
    }
}
