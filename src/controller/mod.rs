//! Controller and action metadata.
//!
//! Controllers are plain `Default` types. Everything the router needs to know
//! about them (mount path, middleware, actions and their parameter bindings)
//! is collected in a [`Registry`] through builder calls, in any order, before
//! the application is built.
//!
//! ```
//! use arbor::prelude::*;
//!
//! #[derive(Default)]
//! struct WidgetsController;
//!
//! #[derive(Default)]
//! struct PartsController;
//!
//! let mut registry = Registry::new();
//! registry
//!     .controller::<WidgetsController>()
//!     .at("/widgets")
//!     .action("list", |a| {
//!         a.get("/").handle(|_this, _ctx, _args| async { Ok(json!([])) })
//!     });
//! registry
//!     .controller::<PartsController>()
//!     .under_at::<WidgetsController>("/parts");
//! ```

mod action;
mod descriptor;
mod registry;

pub use action::Action;
pub use descriptor::{
    ActionDescriptor, ControllerDescriptor, MountEdge, Mountpoint, ParamBinding, ParamSource,
    ResponseDoc,
};
pub use registry::{ControllerEntry, Registry};

pub(crate) use action::{ActionHandler, BoundFn, Instance, Invocation};

use crate::common::TypeIdentity;

/// Registry key of a controller.
pub type ControllerId = TypeIdentity;

/// Any default-constructible, shareable type can be a controller.
///
/// One instance is created per controller when the application is built and
/// that instance serves every request routed to it, concurrently. State kept
/// directly on the controller is shared mutable state across requests and
/// needs its own synchronization.
pub trait Controller: Default + Send + Sync + 'static {}

impl<T> Controller for T where T: Default + Send + Sync + 'static {}
