use crate::dispatch::CallContext;
use crate::exception::HttpException;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

/// Key marking a JSON object as a view to render rather than data to send.
pub const RENDER_VIEW_KEY: &str = "$render_view";

/// Settled result of an action.
pub enum Reply {
    /// Structured value, sent as JSON.
    Json(Value),
    /// Sent literally.
    Text(String),
    /// Rendered by the application's [`ViewRenderer`].
    View { view: String, model: Value },
    /// Sent as is.
    Response(Response),
    /// No value: whatever the action put in the context's response slot is
    /// sent, otherwise `204 No Content`.
    Empty,
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        if let Some(view) = value.get(RENDER_VIEW_KEY).and_then(Value::as_str) {
            return Reply::View {
                view: view.to_string(),
                model: value.clone(),
            };
        }
        match value {
            Value::Object(_) | Value::Array(_) => Reply::Json(value),
            Value::String(text) => Reply::Text(text),
            Value::Null | Value::Bool(_) | Value::Number(_) => Reply::Empty,
        }
    }
}

/// Conversion of action results into a [`Reply`].
pub trait IntoReply: Send {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply {
        self
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> Reply {
        Reply::from(self)
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply {
        Reply::Text(self)
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply {
        Reply::Text(self.to_string())
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply {
        Reply::Empty
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> Reply {
        Reply::Response(self)
    }
}

impl<T: Serialize + Send> IntoReply for Json<T> {
    fn into_reply(self) -> Reply {
        Reply::Response(self.into_response())
    }
}

impl IntoReply for View {
    fn into_reply(self) -> Reply {
        Reply::View {
            view: self.name,
            model: self.model,
        }
    }
}

/// A named template plus the data it is rendered with.
#[derive(Debug, Clone)]
pub struct View {
    pub name: String,
    pub model: Value,
}

impl View {
    pub fn new(name: impl Into<String>, model: Value) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

/// Template engine hook. Arbor ships none; plug one in through
/// [`ApplicationBuilder::views`](crate::lifecycle::ApplicationBuilder::views).
pub trait ViewRenderer: Send + Sync + 'static {
    fn render(&self, view: &str, model: &Value) -> Result<String, HttpException>;
}

pub(crate) fn render(
    reply: Reply,
    ctx: &CallContext,
    views: Option<&dyn ViewRenderer>,
) -> Result<Response, HttpException> {
    match reply {
        Reply::Json(value) => Ok(Json(value).into_response()),
        Reply::Text(text) => Ok(Html(text).into_response()),
        Reply::View { view, model } => {
            let renderer = views.ok_or_else(|| HttpException::View {
                view: view.clone(),
                message: "no view renderer configured".to_string(),
            })?;
            Ok(Html(renderer.render(&view, &model)?).into_response())
        }
        Reply::Response(response) => Ok(response),
        Reply::Empty => Ok(ctx
            .take_response()
            .unwrap_or_else(|| StatusCode::NO_CONTENT.into_response())),
    }
}
