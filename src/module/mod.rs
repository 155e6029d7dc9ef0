use crate::controller::Registry;
use crate::error::Result;

/// Trait for application modules
///
/// A module is a unit of registrations: the controllers, actions and
/// fixtures of one feature. Modules are added to named groups on the
/// [`ApplicationBuilder`](crate::lifecycle::ApplicationBuilder); the
/// `controllers` and `tests` groups are loaded implicitly.
///
/// # Example
/// ```
/// use arbor::prelude::*;
///
/// #[derive(Default)]
/// struct UsersController;
///
/// struct UsersModule;
///
/// impl Module for UsersModule {
///     fn register(registry: &mut Registry) -> arbor::Result<()> {
///         registry.controller::<UsersController>().at("/users").action("list", |a| {
///             a.get("/").handle(|_this, _ctx, _args| async { Ok(json!([])) })
///         });
///         Ok(())
///     }
/// }
/// ```
pub trait Module {
    /// Register all controllers and fixtures of this module
    fn register(registry: &mut Registry) -> Result<()>;
}
