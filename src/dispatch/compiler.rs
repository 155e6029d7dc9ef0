//! Turns the mount forest into axum routes.
//!
//! Compilation runs in three passes over the enabled part of the forest:
//!
//! 1. plan: create controller instances, compile action endpoints and reserve
//!    every canonical route (a clash is a configuration error)
//! 2. reserve strict-slash redirects for controllers not mounted at a
//!    slash-terminated path
//! 3. assemble: build one router per controller, adding trailing-slash
//!    aliases, runner routes and index pages wherever the path is still free
//!
//! Reserving everything up front keeps axum from panicking on overlapping
//! routes and fixes precedence: canonical routes, then redirects, then the rest.

use crate::common::{check_route_path, slash_alias, url_join};
use crate::config::Environment;
use crate::controller::{ControllerId, Registry};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::dispatch::binder::MAX_POSITION;
use crate::dispatch::endpoint::ActionEndpoint;
use crate::dispatch::index::{self, IndexEntry};
use crate::dispatch::ViewRenderer;
use crate::error::{ArborError, Result};
use crate::exception::FilterStack;
use crate::interceptor::{Interceptor, InterceptorLayer};
use crate::testing::{FixtureRegistry, test_runner_routes};
use crate::tree::{Forest, NodeId};
use axum::{
    Router,
    extract::Request,
    http::{Method, StatusCode, Uri, header},
    response::{Html, IntoResponse},
    routing::{MethodFilter, MethodRouter, any, get, on},
};
use regex::Regex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, LazyLock};

static PARAM_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("valid regex"));

pub(crate) struct CompileOptions {
    pub(crate) root: String,
    pub(crate) environment: Environment,
    pub(crate) filters: Arc<FilterStack>,
    pub(crate) views: Option<Arc<dyn ViewRenderer>>,
    pub(crate) fixtures: Arc<FixtureRegistry>,
}

/// A canonical route registered for an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    pub controller: &'static str,
    pub action: String,
}

pub(crate) struct Compiled {
    pub(crate) router: Router,
    pub(crate) routes: Vec<RouteInfo>,
    pub(crate) mounted: Vec<(ControllerId, String)>,
}

struct CompiledController {
    name: &'static str,
    mount_path: String,
    full_path: String,
    middleware: Vec<Arc<dyn Interceptor>>,
    actions: Vec<CompiledAction>,
    children: Vec<CompiledController>,
    test_runner: bool,
    redirect: bool,
}

struct CompiledAction {
    routes: Vec<CompiledRoute>,
    middleware: Vec<Arc<dyn Interceptor>>,
    endpoint: Arc<ActionEndpoint>,
}

struct CompiledRoute {
    method: Method,
    filter: MethodFilter,
    relative: String,
    path: String,
}

enum Occupancy {
    Methods(Vec<Method>),
    Any,
}

/// Paths already taken on the host router. Routes whose paths differ only in
/// parameter names share a slot, since axum cannot hold both.
#[derive(Default)]
struct RouteTable {
    slots: HashMap<String, (String, Occupancy)>,
}

impl RouteTable {
    fn shape(path: &str) -> String {
        PARAM_SEGMENT.replace_all(path, "{}").into_owned()
    }

    fn reserve(&mut self, path: &str, method: &Method) -> bool {
        match self.slots.entry(Self::shape(path)) {
            Entry::Vacant(slot) => {
                slot.insert((path.to_string(), Occupancy::Methods(vec![method.clone()])));
                true
            }
            Entry::Occupied(mut slot) => {
                let (taken_path, occupancy) = slot.get_mut();
                match occupancy {
                    Occupancy::Methods(methods) if taken_path == path && !methods.contains(method) => {
                        methods.push(method.clone());
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    fn reserve_any(&mut self, path: &str) -> bool {
        match self.slots.entry(Self::shape(path)) {
            Entry::Vacant(slot) => {
                slot.insert((path.to_string(), Occupancy::Any));
                true
            }
            Entry::Occupied(_) => false,
        }
    }
}

pub(crate) fn compile(
    registry: &Registry,
    forest: &Forest,
    options: &CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Compiled> {
    valid_path(&url_join(&[options.root.as_str(), "/"]), || "the root path".to_string())?;

    let mut table = RouteTable::default();
    let mut routes = Vec::new();
    let mut mounted = Vec::new();

    let mut compiled = Vec::new();
    for &root in forest.roots() {
        let planned = plan(
            registry,
            forest,
            root,
            options,
            &mut table,
            &mut routes,
            &mut mounted,
            diagnostics,
        )?;
        compiled.extend(planned);
    }

    for controller in &mut compiled {
        reserve_redirects(controller, &mut table);
    }

    let mut router = Router::new();
    for controller in &compiled {
        router = router.merge(assemble(controller, options, &mut table));
        if controller.redirect {
            router = router.route(&controller.full_path, redirect_to(&controller.full_path));
        }
    }

    if options.environment.is_development() {
        let path = url_join(&[options.root.as_str(), "/"]);
        if table.reserve(&path, &Method::GET) {
            let entries: Vec<IndexEntry> = compiled
                .iter()
                .map(|controller| IndexEntry {
                    label: "[Controller]".to_string(),
                    href: format!("{}/", controller.mount_path),
                })
                .collect();
            router = router.route(&path, index_page("Controllers", &entries));
        }
    }

    tracing::info!(
        controllers = mounted.len(),
        routes = routes.len(),
        "Router tree compiled"
    );

    Ok(Compiled {
        router,
        routes,
        mounted,
    })
}

#[allow(clippy::too_many_arguments)]
fn plan(
    registry: &Registry,
    forest: &Forest,
    node_id: NodeId,
    options: &CompileOptions,
    table: &mut RouteTable,
    routes: &mut Vec<RouteInfo>,
    mounted: &mut Vec<(ControllerId, String)>,
    diagnostics: &mut Diagnostics,
) -> Result<Option<CompiledController>> {
    let node = forest.node(node_id);
    let Some(descriptor) = registry.get(&node.controller()) else {
        return Ok(None);
    };
    let name = descriptor.name();

    if !descriptor.mount_enabled() {
        diagnostics.warn(
            DiagnosticKind::DisabledController,
            format!("Controller {name} is disabled by its mount condition; it and its children are not routed"),
        );
        return Ok(None);
    }
    if !descriptor.is_explicitly_declared() {
        diagnostics.warn(
            DiagnosticKind::UndeclaredController,
            format!("Controller {name} was never declared but is reachable; mounting it at {}", node.full_path()),
        );
    }

    // Index pages and children hang below the slash-terminated form.
    valid_path(&url_join(&[node.full_path(), "/"]), || format!("controller {name}"))?;

    let instance = descriptor.instantiate();
    let mut actions = Vec::with_capacity(descriptor.actions().len());

    for (action_name, action) in descriptor.actions() {
        if !action.is_explicitly_bound() {
            diagnostics.warn(
                DiagnosticKind::UndeclaredAction,
                format!("Action {name}::{action_name} has no route; mounting it at GET /{action_name}"),
            );
        }
        if action.bindings().contains_key(&0) {
            return Err(ArborError::ReservedContextSlot {
                controller: name.to_string(),
                action: action_name.clone(),
            });
        }
        if let Some(&position) = action.bindings().keys().find(|&&position| position > MAX_POSITION) {
            return Err(ArborError::BindingOutOfRange {
                controller: name.to_string(),
                action: action_name.clone(),
                position,
                max: MAX_POSITION,
            });
        }
        let handler = action.handler.clone().ok_or_else(|| ArborError::MissingHandler {
            controller: name.to_string(),
            action: action_name.clone(),
        })?;

        let mut compiled_routes = Vec::new();
        for mountpoint in action.effective_mountpoints(action_name) {
            let filter = MethodFilter::try_from(mountpoint.method.clone()).map_err(|_| {
                ArborError::InvalidMethod {
                    method: mountpoint.method.to_string(),
                    controller: name.to_string(),
                    action: action_name.clone(),
                }
            })?;
            let path = url_join(&[node.full_path(), "/", mountpoint.path.as_str()]);
            valid_path(&path, || format!("action {name}::{action_name}"))?;
            if !table.reserve(&path, &mountpoint.method) {
                return Err(ArborError::DuplicateRoute {
                    method: mountpoint.method.to_string(),
                    path,
                    controller: name.to_string(),
                    action: action_name.clone(),
                });
            }
            tracing::debug!("Mapped {{{}, {}}} to {}::{}", path, mountpoint.method, name, action_name);
            routes.push(RouteInfo {
                method: mountpoint.method.clone(),
                path: path.clone(),
                controller: name,
                action: action_name.clone(),
            });
            compiled_routes.push(CompiledRoute {
                method: mountpoint.method,
                filter,
                relative: mountpoint.path,
                path,
            });
        }

        actions.push(CompiledAction {
            routes: compiled_routes,
            middleware: action.middleware.clone(),
            endpoint: Arc::new(ActionEndpoint {
                controller: name,
                action: action_name.clone(),
                instance: Arc::clone(&instance),
                handler,
                bindings: action.bindings().clone(),
                filters: Arc::clone(&options.filters),
                views: options.views.clone(),
            }),
        });
    }

    tracing::info!("Mounted {} at {}", name, node.full_path());
    mounted.push((descriptor.id(), node.full_path().to_string()));

    let mut children = Vec::new();
    for &child in node.children() {
        let planned = plan(registry, forest, child, options, table, routes, mounted, diagnostics)?;
        children.extend(planned);
    }

    Ok(Some(CompiledController {
        name,
        mount_path: descriptor.mount_path().to_string(),
        full_path: node.full_path().to_string(),
        middleware: descriptor.middleware.clone(),
        actions,
        children,
        test_runner: descriptor.has_test_runner(),
        redirect: false,
    }))
}

fn valid_path(path: &str, owner: impl FnOnce() -> String) -> Result<()> {
    check_route_path(path).map_err(|reason| ArborError::InvalidPath {
        path: path.to_string(),
        owner: owner(),
        reason,
    })
}

fn reserve_redirects(controller: &mut CompiledController, table: &mut RouteTable) {
    controller.redirect =
        !controller.full_path.ends_with('/') && table.reserve_any(&controller.full_path);
    for child in &mut controller.children {
        reserve_redirects(child, table);
    }
}

fn assemble(controller: &CompiledController, options: &CompileOptions, table: &mut RouteTable) -> Router {
    let mut router = Router::new();

    for action in &controller.actions {
        let layer = (!action.middleware.is_empty())
            .then(|| InterceptorLayer::new(action.middleware.clone(), Arc::clone(&options.filters)));

        for route in &action.routes {
            let method_router = action_router(route.filter, &action.endpoint, layer.as_ref());
            router = router.route(&route.path, method_router.clone());

            if let Some(alias) = slash_alias(&route.path) {
                if table.reserve(&alias, &route.method) {
                    router = router.route(&alias, method_router);
                } else {
                    tracing::debug!("Skipping alias {} {}: path already routed", route.method, alias);
                }
            }
        }
    }

    for child in &controller.children {
        router = router.merge(assemble(child, options, table));
        if child.redirect {
            router = router.route(&child.full_path, redirect_to(&child.full_path));
        }
    }

    if controller.test_runner {
        for (method, relative, method_router) in test_runner_routes(Arc::clone(&options.fixtures)) {
            let path = url_join(&[controller.full_path.as_str(), "/", relative.as_str()]);
            if table.reserve(&path, &method) {
                router = router.route(&path, method_router);
            } else {
                tracing::debug!("Skipping test runner route {} {}: path already routed", method, path);
            }
        }
    }

    if options.environment.is_development() {
        let path = url_join(&[controller.full_path.as_str(), "/"]);
        if table.reserve(&path, &Method::GET) {
            let mut entries: Vec<IndexEntry> = controller
                .children
                .iter()
                .map(|child| IndexEntry {
                    label: "[Controller]".to_string(),
                    href: format!("{}/", child.mount_path),
                })
                .collect();
            for action in &controller.actions {
                entries.extend(action.routes.iter().map(|route| IndexEntry {
                    label: format!("[{}]", route.method),
                    href: route.relative.clone(),
                }));
            }
            router = router.route(&path, index_page(controller.name, &entries));
        }
    }

    if controller.middleware.is_empty() {
        router
    } else {
        router.layer(InterceptorLayer::new(
            controller.middleware.clone(),
            Arc::clone(&options.filters),
        ))
    }
}

fn action_router(
    filter: MethodFilter,
    endpoint: &Arc<ActionEndpoint>,
    layer: Option<&InterceptorLayer>,
) -> MethodRouter {
    let endpoint = Arc::clone(endpoint);
    let method_router = on(filter, move |request: Request| async move {
        endpoint.dispatch(request).await
    });
    match layer {
        Some(layer) => method_router.layer(layer.clone()),
        None => method_router,
    }
}

/// Strict-slash redirect: `/widgets/parts` → `/widgets/parts/`, query kept.
fn redirect_to(full_path: &str) -> MethodRouter {
    let target = format!("{full_path}/");
    any(move |uri: Uri| async move {
        let location = match uri.query() {
            Some(query) => format!("{target}?{query}"),
            None => target,
        };
        (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
    })
}

fn index_page(title: &str, entries: &[IndexEntry]) -> MethodRouter {
    let page = index::render(title, entries);
    get(move || async move { Html(page) })
}
