//! Request dispatch: compiling the forest into routes and running actions.

mod binder;
mod compiler;
mod context;
mod endpoint;
mod index;
mod reply;

pub use binder::{Args, MAX_POSITION};
pub use compiler::RouteInfo;
pub use context::{CallContext, Disposable};
pub use reply::{IntoReply, RENDER_VIEW_KEY, Reply, View, ViewRenderer};

pub(crate) use compiler::{CompileOptions, Compiled, compile};
pub(crate) use endpoint::panic_message;
