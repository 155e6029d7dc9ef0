use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArborError>;

/// Configuration errors. Any of these halts initialization.
#[derive(Debug, Error)]
pub enum ArborError {
    #[error("Action `{controller}::{action}` binds parameter position 0, which is reserved for the call context")]
    ReservedContextSlot { controller: String, action: String },

    #[error("Action `{controller}::{action}` binds parameter position {position}; positions run from 1 to {max}")]
    BindingOutOfRange {
        controller: String,
        action: String,
        position: usize,
        max: usize,
    },

    #[error("Invalid route path `{path}` on {owner}: {reason}")]
    InvalidPath { path: String, owner: String, reason: String },

    #[error("Controller `{child}` is mounted under more than one parent: {parents}")]
    MultipleParents { child: String, parents: String },

    #[error("Route {method} {path} is registered twice (second registration by `{controller}::{action}`)")]
    DuplicateRoute {
        method: String,
        path: String,
        controller: String,
        action: String,
    },

    #[error("Unsupported HTTP method `{method}` on `{controller}::{action}`")]
    InvalidMethod {
        method: String,
        controller: String,
        action: String,
    },

    #[error("Action `{controller}::{action}` has no handler")]
    MissingHandler { controller: String, action: String },

    #[error("Module registration failed: {message}")]
    ModuleRegistrationFailed { message: String },
}

impl ArborError {
    pub fn module_failed(message: impl Into<String>) -> Self {
        Self::ModuleRegistrationFailed {
            message: message.into(),
        }
    }
}
