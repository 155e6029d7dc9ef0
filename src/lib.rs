//! # Arbor
//!
//! Declarative controllers for axum, assembled into a nested router tree.
//!
//! Controllers are plain `Default` types registered in a [`Registry`]
//! together with their mount path, interceptors and actions. Registrations
//! can come from many modules in any order; a child controller may be
//! registered before the parent it is mounted under. Building the
//! [`Application`] resolves the mount tree, computes every full path and
//! compiles one handler per action that binds parameters from the request,
//! awaits the action and turns its result into a response.
//!
//! ## Features
//!
//! - **Nested controllers**: children mount below their parent's path, with
//!   strict trailing-slash redirects
//! - **Parameter binding**: body, query, path, header and cookie values by
//!   argument position
//! - **Interceptors and guards** per controller (covering its subtree) or per
//!   action, run in declaration order
//! - **Exception filters** ending in a default filter that hides details in
//!   production
//! - **In-app test fixtures** runnable over HTTP
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arbor::prelude::*;
//!
//! #[derive(Default)]
//! struct WidgetsController;
//!
//! #[derive(Default)]
//! struct PartsController;
//!
//! struct ShopModule;
//!
//! impl Module for ShopModule {
//!     fn register(registry: &mut Registry) -> arbor::Result<()> {
//!         registry
//!             .controller::<WidgetsController>()
//!             .at("/widgets")
//!             .middleware(LoggingInterceptor::named("widgets"))
//!             .action("find", |a| {
//!                 a.get("/find")
//!                     .from_query(1, "value")
//!                     .handle(|_this, _ctx, args| async move {
//!                         Ok(json!({ "value": args.str(1) }))
//!                     })
//!             });
//!
//!         registry
//!             .controller::<PartsController>()
//!             .under_at::<WidgetsController>("/parts")
//!             .action("show", |a| {
//!                 a.get("/{id}")
//!                     .from_path(1, "id")
//!                     .handle(|_this, _ctx, args| async move {
//!                         let id = args.str(1).ok_or_else(|| HttpException::bad_request("id"))?;
//!                         Ok(json!({ "part": id }))
//!                     })
//!             });
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = Application::builder()
//!         .module::<ShopModule>("controllers")
//!         .build()?;
//!
//!     // GET /widgets/find?value=42, GET /widgets/parts/7
//!     let router = app.mount(Router::new());
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod common;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod exception;
pub mod guard;
pub mod interceptor;
pub mod lifecycle;
pub mod module;
pub mod testing;
pub mod tree;

// Re-export core types
pub use controller::{Action, Controller, Registry};
pub use error::{ArborError, Result};
pub use lifecycle::{Application, ApplicationBuilder, is_initialized};
pub use module::Module;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use arbor::prelude::*;
/// ```
pub mod prelude {
    pub use crate::common::url_join;
    pub use crate::config::{ConfigService, Environment};
    pub use crate::controller::{Action, Controller, Registry};
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind};
    pub use crate::dispatch::{Args, CallContext, Disposable, IntoReply, Reply, View, ViewRenderer};
    pub use crate::error::ArborError;
    pub use crate::exception::{ArgumentsHost, ExceptionFilter, FilterChain, HttpException};
    pub use crate::guard::{Guard, GuardError, GuardResult, Guarded};
    pub use crate::interceptor::{Interceptor, InterceptorResult, LoggingInterceptor, Next};
    pub use crate::lifecycle::{Application, ApplicationBuilder};
    pub use crate::module::Module;
    pub use crate::testing::{Fixture, TestResult};
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        http::{Method, StatusCode},
        response::{IntoResponse, Response},
    };
    pub use serde_json::json;
    pub use std::sync::Arc;
}
