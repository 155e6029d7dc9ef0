use crate::common::url_join;
use crate::controller::descriptor::{ActionDescriptor, Mountpoint, ParamBinding, ParamSource, ResponseDoc};
use crate::controller::Controller;
use crate::dispatch::{Args, CallContext, IntoReply, Reply};
use crate::exception::HttpException;
use crate::interceptor::Interceptor;
use axum::{extract::Request, http::Method, response::Response};
use futures::future::BoxFuture;
use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

/// Outcome of calling a bound action: settled already, or still pending.
pub(crate) enum Invocation {
    Ready(Result<Reply, HttpException>),
    Pending(BoxFuture<'static, Result<Reply, HttpException>>),
}

pub(crate) type BoundFn = Arc<dyn Fn(Instance, CallContext, Args) -> Invocation + Send + Sync>;
pub(crate) type RawFn =
    Arc<dyn Fn(Instance, Request) -> BoxFuture<'static, Result<Response, HttpException>> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum ActionHandler {
    /// Receives the call context and bound arguments.
    Bound(BoundFn),
    /// Compatibility mode: receives the raw request, no binding.
    Raw(RawFn),
}

fn downcast<C: Controller>(instance: Instance) -> Result<Arc<C>, HttpException> {
    instance.downcast::<C>().map_err(|_| {
        HttpException::internal(format!(
            "controller instance is not a `{}`",
            std::any::type_name::<C>()
        ))
    })
}

/// Builder for one action of controller `C`.
///
/// Verb methods add mountpoints, `from_*` methods add parameter bindings and
/// one of [`handle`](Action::handle), [`handle_sync`](Action::handle_sync) or
/// [`raw`](Action::raw) supplies the function. Positions are 1-based in the
/// argument list; position 0 is the call context and cannot be bound.
pub struct Action<C> {
    mountpoints: Vec<Mountpoint>,
    middleware: Vec<Arc<dyn Interceptor>>,
    bindings: BTreeMap<usize, ParamBinding>,
    doc: Option<String>,
    responses: BTreeMap<u16, ResponseDoc>,
    handler: Option<ActionHandler>,
    _controller: PhantomData<fn() -> C>,
}

impl<C: Controller> Default for Action<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Controller> Action<C> {
    pub fn new() -> Self {
        Self {
            mountpoints: Vec::new(),
            middleware: Vec::new(),
            bindings: BTreeMap::new(),
            doc: None,
            responses: BTreeMap::new(),
            handler: None,
            _controller: PhantomData,
        }
    }

    /// Reachable at `method` + `path`, relative to the controller.
    pub fn route(mut self, method: Method, path: &str) -> Self {
        self.mountpoints.push(Mountpoint {
            method,
            path: url_join(&["/", path]),
        });
        self
    }

    pub fn get(self, path: &str) -> Self {
        self.route(Method::GET, path)
    }

    pub fn post(self, path: &str) -> Self {
        self.route(Method::POST, path)
    }

    pub fn put(self, path: &str) -> Self {
        self.route(Method::PUT, path)
    }

    pub fn patch(self, path: &str) -> Self {
        self.route(Method::PATCH, path)
    }

    pub fn delete(self, path: &str) -> Self {
        self.route(Method::DELETE, path)
    }

    fn bind(mut self, position: usize, source: ParamSource, key: &str) -> Self {
        self.bindings.insert(
            position,
            ParamBinding {
                source,
                key: key.to_string(),
            },
        );
        self
    }

    /// Field `key` of the JSON request body.
    pub fn from_body(self, position: usize, key: &str) -> Self {
        self.bind(position, ParamSource::Body, key)
    }

    pub fn from_query(self, position: usize, key: &str) -> Self {
        self.bind(position, ParamSource::Query, key)
    }

    /// Route parameter, e.g. `id` for a mountpoint `/{id}`.
    pub fn from_path(self, position: usize, key: &str) -> Self {
        self.bind(position, ParamSource::Path, key)
    }

    pub fn from_header(self, position: usize, key: &str) -> Self {
        self.bind(position, ParamSource::Header, key)
    }

    pub fn from_cookie(self, position: usize, key: &str) -> Self {
        self.bind(position, ParamSource::Cookie, key)
    }

    /// Runs before the handler, after every controller-level interceptor.
    pub fn middleware(mut self, interceptor: impl Interceptor) -> Self {
        self.middleware.push(Arc::new(interceptor));
        self
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    /// Documents a possible response of this action.
    pub fn response(mut self, status: u16, description: &str, type_name: &str) -> Self {
        self.responses.insert(
            status,
            ResponseDoc {
                description: description.to_string(),
                type_name: type_name.to_string(),
            },
        );
        self
    }

    /// Asynchronous handler. The dispatcher suspends on the returned future.
    pub fn handle<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, CallContext, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpException>> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.handler = Some(ActionHandler::Bound(Arc::new(
            move |instance, ctx, args| match downcast::<C>(instance) {
                Ok(controller) => {
                    let pending = f(controller, ctx, args);
                    Invocation::Pending(Box::pin(async move { pending.await.map(IntoReply::into_reply) }))
                }
                Err(err) => Invocation::Ready(Err(err)),
            },
        )));
        self
    }

    /// Synchronous handler. Its result is used without suspending.
    pub fn handle_sync<F, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, CallContext, Args) -> Result<R, HttpException> + Send + Sync + 'static,
        R: IntoReply,
    {
        self.handler = Some(ActionHandler::Bound(Arc::new(move |instance, ctx, args| {
            Invocation::Ready(downcast::<C>(instance).and_then(|controller| {
                f(controller, ctx, args).map(IntoReply::into_reply)
            }))
        })));
        self
    }

    /// Compatibility mode: the handler gets the untouched request and builds
    /// the response itself. Bindings are ignored.
    pub fn raw<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HttpException>> + Send + 'static,
    {
        self.handler = Some(ActionHandler::Raw(Arc::new(move |instance, request| {
            let pending: BoxFuture<'static, Result<Response, HttpException>> =
                match downcast::<C>(instance) {
                    Ok(controller) => Box::pin(f(controller, request)),
                    Err(err) => Box::pin(async move { Err(err) }),
                };
            pending
        })));
        self
    }

    pub(crate) fn merge_into(self, descriptor: &mut ActionDescriptor) {
        if !self.mountpoints.is_empty() {
            descriptor.explicitly_bound = true;
        }
        descriptor.mountpoints.extend(self.mountpoints);
        descriptor.middleware.extend(self.middleware);
        descriptor.bindings.extend(self.bindings);
        descriptor.responses.extend(self.responses);
        if let Some(doc) = self.doc {
            descriptor.doc = doc;
        }
        if let Some(handler) = self.handler {
            descriptor.handler = Some(handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Widgets;

    #[test]
    fn test_merge_marks_explicit_routes() {
        let mut descriptor = ActionDescriptor::default();
        Action::<Widgets>::new()
            .from_query(1, "value")
            .merge_into(&mut descriptor);
        assert!(!descriptor.is_explicitly_bound());
        assert_eq!(descriptor.effective_mountpoints("list")[0].path, "/list");

        Action::<Widgets>::new()
            .get("items")
            .post("/items/")
            .merge_into(&mut descriptor);
        assert!(descriptor.is_explicitly_bound());
        assert_eq!(descriptor.mountpoints()[0].path, "/items");
        assert_eq!(descriptor.mountpoints()[1].method, Method::POST);
        assert_eq!(descriptor.mountpoints()[1].path, "/items/");
        assert_eq!(descriptor.bindings()[&1].source, ParamSource::Query);
    }

    #[test]
    fn test_handler_modes() {
        let mut descriptor = ActionDescriptor::default();
        Action::<Widgets>::new()
            .handle(|_this, _ctx, _args| async { Ok(json!({})) })
            .merge_into(&mut descriptor);
        assert!(!descriptor.is_compatibility_mode());

        Action::<Widgets>::new()
            .raw(|_this, _request| async { Err(HttpException::internal("unused")) })
            .merge_into(&mut descriptor);
        assert!(descriptor.is_compatibility_mode());
    }
}
