//! Application Bootstrap
//!
//! Provides a high-level API for collecting registrations, building the
//! router tree once and mounting it on a host axum router.

use crate::common::{mount_path, url_join};
use crate::config::{ConfigService, Environment};
use crate::controller::{Controller, ControllerId, Registry};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::dispatch::{self, CompileOptions, RouteInfo, ViewRenderer};
use crate::docs::{self, ControllerDoc};
use crate::error::Result;
use crate::exception::{ExceptionFilter, FilterStack, HttpExceptionFilter, not_found};
use crate::module::Module;
use crate::testing::FixtureRegistry;
use crate::tree::{self, Forest};
use axum::{Router, http::Method};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Groups loaded even when not required. Missing ones are skipped silently.
const IMPLICIT_GROUPS: [&str; 2] = ["controllers", "tests"];

type Loader = Box<dyn FnOnce(&mut Registry) -> Result<()> + Send>;

/// The built application: a frozen registry, its forest and compiled routes.
///
/// # Example
///
/// ```rust,no_run
/// use arbor::prelude::*;
///
/// #[derive(Default)]
/// struct HealthController;
///
/// struct HealthModule;
///
/// impl Module for HealthModule {
///     fn register(registry: &mut Registry) -> arbor::Result<()> {
///         registry.controller::<HealthController>().at("/health").action("check", |a| {
///             a.get("/").handle_sync(|_this, _ctx, _args| Ok("ok"))
///         });
///         Ok(())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let app = Application::builder()
///         .root("/api")
///         .module::<HealthModule>("controllers")
///         .build()?;
///
///     let router = app.mount(Router::new());
///     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
///     axum::serve(listener, router).await?;
///     Ok(())
/// }
/// ```
pub struct Application {
    registry: Registry,
    forest: Forest,
    router: Router,
    routes: Vec<RouteInfo>,
    mounted: HashMap<ControllerId, String>,
    root: String,
    environment: Environment,
    diagnostics: Diagnostics,
    fixtures: Arc<FixtureRegistry>,
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Merge the compiled routes into `host` and answer everything else with 404.
    pub fn mount(&self, host: Router) -> Router {
        host.merge(self.router.clone()).fallback(not_found)
    }

    /// The compiled routes on their own, with the 404 fallback.
    pub fn router(&self) -> Router {
        self.mount(Router::new())
    }

    /// Path that reaches `action` of controller `C`.
    ///
    /// Without a method the first mountpoint is used. Returns an empty string
    /// when the controller, action or method is unknown, or when the
    /// controller is not mounted.
    pub fn action_route<C: Controller>(&self, action: &str, method: Option<&Method>) -> String {
        let id = ControllerId::of::<C>();
        let (Some(descriptor), Some(full_path)) = (self.registry.get(&id), self.mounted.get(&id)) else {
            return String::new();
        };
        let Some(action_descriptor) = descriptor.action(action) else {
            return String::new();
        };

        let mountpoints = action_descriptor.effective_mountpoints(action);
        let mountpoint = match method {
            None => mountpoints.first(),
            Some(method) => mountpoints.iter().find(|mountpoint| {
                mountpoint.method.as_str().eq_ignore_ascii_case(method.as_str())
            }),
        };

        mountpoint
            .map(|mountpoint| url_join(&[full_path.as_str(), "/", mountpoint.path.as_str()]))
            .unwrap_or_default()
    }

    /// Full path of controller `C`, if it is mounted.
    pub fn controller_path<C: Controller>(&self) -> Option<&str> {
        self.mounted.get(&ControllerId::of::<C>()).map(String::as_str)
    }

    /// Every canonical action route, in registration order.
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    pub fn docs(&self) -> Vec<ControllerDoc> {
        docs::document(&self.registry, &self.forest)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    /// Registered test fixtures, as served by the runner routes.
    pub fn fixtures(&self) -> &FixtureRegistry {
        &self.fixtures
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn root_path(&self) -> &str {
        &self.root
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }
}

/// Builder for Application
pub struct ApplicationBuilder {
    config: ConfigService,
    root: Option<String>,
    environment: Option<Environment>,
    groups: IndexMap<String, Vec<Loader>>,
    required: Vec<String>,
    filters: Vec<Arc<dyn ExceptionFilter>>,
    views: Option<Arc<dyn ViewRenderer>>,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    /// Create a new application builder, configured from the environment
    pub fn new() -> Self {
        Self::with_config(ConfigService::new())
    }

    pub fn with_config(config: ConfigService) -> Self {
        Self {
            config,
            root: None,
            environment: None,
            groups: IndexMap::new(),
            required: Vec::new(),
            filters: Vec::new(),
            views: None,
        }
    }

    /// Mount root for every root controller. Defaults to `ARBOR_ROOT`, then `/`.
    pub fn root(mut self, path: &str) -> Self {
        self.root = Some(path.to_string());
        self
    }

    /// Overrides `ARBOR_ENV`.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Add module `M` to `group`.
    pub fn module<M: Module + 'static>(self, group: &str) -> Self {
        self.group(group, M::register)
    }

    /// Add a registration function to `group`.
    pub fn group<F>(mut self, group: &str, register: F) -> Self
    where
        F: FnOnce(&mut Registry) -> Result<()> + Send + 'static,
    {
        self.groups
            .entry(group.to_string())
            .or_default()
            .push(Box::new(register));
        self
    }

    /// Load `group`; a missing required group is reported, not fatal.
    pub fn require(mut self, group: &str) -> Self {
        if !self.required.iter().any(|name| name == group) {
            self.required.push(group.to_string());
        }
        self
    }

    /// Add an exception filter. Filters run in the order they are added,
    /// before the built-in one.
    pub fn exception_filter(mut self, filter: impl ExceptionFilter) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn views(mut self, renderer: impl ViewRenderer) -> Self {
        self.views = Some(Arc::new(renderer));
        self
    }

    /// Load the module groups, build the forest and compile the routes.
    ///
    /// # Errors
    ///
    /// Returns an error if a module fails to register or the registrations
    /// are inconsistent (reserved or out-of-range binding positions, multiple
    /// parents, duplicate routes, malformed route paths, unsupported methods,
    /// actions without a handler).
    pub fn build(mut self) -> Result<Application> {
        let environment = self
            .environment
            .unwrap_or_else(|| self.config.environment());
        let root = mount_path(
            &self
                .root
                .take()
                .or_else(|| self.config.root_path())
                .unwrap_or_else(|| "/".to_string()),
        );

        tracing::info!(%environment, root = %root, "Starting application initialization...");

        let mut diagnostics = Diagnostics::new();
        let mut registry = Registry::new();

        let mut requested: Vec<(String, bool)> = self
            .required
            .iter()
            .map(|group| (group.clone(), true))
            .collect();
        for implicit in IMPLICIT_GROUPS {
            if !requested.iter().any(|(group, _)| group == implicit) {
                requested.push((implicit.to_string(), false));
            }
        }

        for (group, explicit) in requested {
            match self.groups.shift_remove(&group) {
                Some(loaders) => {
                    tracing::info!("Loading components from: {}", group);
                    for register in loaders {
                        register(&mut registry)?;
                    }
                }
                None if explicit => diagnostics.warn(
                    DiagnosticKind::MissingModule,
                    format!("Module group {group} was required but nothing was registered under it"),
                ),
                None => tracing::debug!("No module group {}, skipping", group),
            }
        }
        for group in self.groups.keys() {
            tracing::debug!("Module group {} was never required; not loaded", group);
        }

        let mut forest = tree::build_forest(&registry, &mut diagnostics)?;
        forest.rebase(&registry, &root);

        let filters = Arc::new(FilterStack::new(
            self.filters,
            HttpExceptionFilter::new(environment),
        ));

        // Fixtures are only read from here on; the runner routes share them.
        let fixtures = Arc::new(registry.take_fixtures());
        let options = CompileOptions {
            root: root.clone(),
            environment,
            filters,
            views: self.views,
            fixtures: Arc::clone(&fixtures),
        };
        let compiled = dispatch::compile(&registry, &forest, &options, &mut diagnostics)?;

        super::mark_initialized();
        tracing::info!(
            warnings = diagnostics.len(),
            "Application initialization complete"
        );

        Ok(Application {
            registry,
            forest,
            router: compiled.router,
            routes: compiled.routes,
            mounted: compiled.mounted.into_iter().collect(),
            root,
            environment,
            diagnostics,
            fixtures,
        })
    }
}
