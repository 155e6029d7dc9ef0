//! Application bootstrap.
//!
//! ```text
//! 1. Configuration loading (ARBOR_ENV, ARBOR_ROOT)
//!    ↓
//! 2. Module groups register controllers and fixtures
//!    ↓
//! 3. Mount forest is built (multiple parents are fatal)
//!    ↓
//! 4. Forest is compiled into routes (reserved slot, duplicate routes fatal)
//!    ↓
//! 5. Application::mount(host) merges the routes and installs the 404 fallback
//! ```

mod application;

pub use application::{Application, ApplicationBuilder};

use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Whether any application finished initialization in this process.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

pub(crate) fn mark_initialized() {
    INITIALIZED.store(true, Ordering::Release);
}
