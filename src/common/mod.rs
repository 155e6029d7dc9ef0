//! Building blocks shared across the registry, tree and dispatch layers.

mod identity;
mod path;

pub use identity::TypeIdentity;
pub use path::{mount_path, url_join};
pub(crate) use path::{check_route_path, slash_alias};
