use crate::controller::{ActionHandler, BoundFn, Instance, Invocation, ParamBinding};
use crate::dispatch::{CallContext, ViewRenderer, binder, reply};
use crate::exception::{ArgumentsHost, FilterStack, HttpException};
use axum::{extract::Request, http::request::Parts, response::Response};
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Compiled handler of one action, shared by all of its routes.
pub(crate) struct ActionEndpoint {
    pub(crate) controller: &'static str,
    pub(crate) action: String,
    pub(crate) instance: Instance,
    pub(crate) handler: ActionHandler,
    pub(crate) bindings: BTreeMap<usize, ParamBinding>,
    pub(crate) filters: Arc<FilterStack>,
    pub(crate) views: Option<Arc<dyn ViewRenderer>>,
}

impl ActionEndpoint {
    pub(crate) async fn dispatch(&self, request: Request) -> Response {
        let host = ArgumentsHost::from_request(&request);

        let outcome = match &self.handler {
            ActionHandler::Raw(raw) => {
                AssertUnwindSafe(raw(Arc::clone(&self.instance), request))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(self.panicked(payload)))
            }
            ActionHandler::Bound(bound) => {
                let (mut parts, body) = request.into_parts();
                let ctx = CallContext::new(&parts);
                let outcome = self.run_bound(bound, &ctx, &mut parts, body).await;
                ctx.dispose();
                outcome
            }
        };

        match outcome {
            Ok(response) => response,
            Err(error) => self.filters.handle(error, &host),
        }
    }

    async fn run_bound(
        &self,
        bound: &BoundFn,
        ctx: &CallContext,
        parts: &mut Parts,
        body: axum::body::Body,
    ) -> Result<Response, HttpException> {
        let args = binder::bind(&self.bindings, parts, body).await?;

        let invocation = std::panic::catch_unwind(AssertUnwindSafe(|| {
            bound(Arc::clone(&self.instance), ctx.clone(), args)
        }))
        .map_err(|payload| self.panicked(payload))?;

        let settled = match invocation {
            Invocation::Ready(result) => result,
            Invocation::Pending(pending) => AssertUnwindSafe(pending)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(self.panicked(payload))),
        }?;

        reply::render(settled, ctx, self.views.as_deref())
    }

    fn panicked(&self, payload: Box<dyn Any + Send>) -> HttpException {
        HttpException::internal(format!(
            "{}::{} panicked: {}",
            self.controller,
            self.action,
            panic_message(payload.as_ref())
        ))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
