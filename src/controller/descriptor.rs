use crate::controller::{ActionHandler, ControllerId, Instance};
use crate::interceptor::Interceptor;
use axum::http::Method;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

pub(crate) type Factory = Arc<dyn Fn() -> Instance + Send + Sync>;

/// One (verb, path) pair an action is reachable at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mountpoint {
    pub method: Method,
    pub path: String,
}

/// Where a bound parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParamSource {
    Body,
    Query,
    Path,
    Header,
    Cookie,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub source: ParamSource,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseDoc {
    pub description: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Metadata of one action, merged from every builder call that touched it.
#[derive(Default)]
pub struct ActionDescriptor {
    pub(crate) mountpoints: Vec<Mountpoint>,
    pub(crate) middleware: Vec<Arc<dyn Interceptor>>,
    pub(crate) bindings: BTreeMap<usize, ParamBinding>,
    pub(crate) explicitly_bound: bool,
    pub(crate) doc: String,
    pub(crate) responses: BTreeMap<u16, ResponseDoc>,
    pub(crate) handler: Option<ActionHandler>,
}

impl ActionDescriptor {
    pub fn mountpoints(&self) -> &[Mountpoint] {
        &self.mountpoints
    }

    /// The declared mountpoints, or the `GET /<name>` fallback when the
    /// action never received an explicit route.
    pub fn effective_mountpoints(&self, name: &str) -> Vec<Mountpoint> {
        if self.explicitly_bound {
            self.mountpoints.clone()
        } else {
            vec![Mountpoint {
                method: Method::GET,
                path: format!("/{name}"),
            }]
        }
    }

    pub fn bindings(&self) -> &BTreeMap<usize, ParamBinding> {
        &self.bindings
    }

    pub fn is_explicitly_bound(&self) -> bool {
        self.explicitly_bound
    }

    pub fn is_compatibility_mode(&self) -> bool {
        matches!(self.handler, Some(ActionHandler::Raw(_)))
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn responses(&self) -> &BTreeMap<u16, ResponseDoc> {
        &self.responses
    }
}

/// Metadata of one controller type.
pub struct ControllerDescriptor {
    pub(crate) id: ControllerId,
    pub(crate) factory: Factory,
    pub(crate) mount_path: String,
    pub(crate) middleware: Vec<Arc<dyn Interceptor>>,
    pub(crate) actions: IndexMap<String, ActionDescriptor>,
    pub(crate) is_child: bool,
    pub(crate) mount_enabled: bool,
    pub(crate) explicitly_declared: bool,
    pub(crate) doc: String,
    pub(crate) test_runner: bool,
}

impl ControllerDescriptor {
    pub(crate) fn new(id: ControllerId, factory: Factory) -> Self {
        Self {
            id,
            factory,
            mount_path: crate::common::mount_path(id.short_name()),
            middleware: Vec::new(),
            actions: IndexMap::new(),
            is_child: false,
            mount_enabled: true,
            explicitly_declared: false,
            doc: String::new(),
            test_runner: false,
        }
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.short_name()
    }

    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    pub fn actions(&self) -> &IndexMap<String, ActionDescriptor> {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.get(name)
    }

    pub fn is_child(&self) -> bool {
        self.is_child
    }

    pub fn mount_enabled(&self) -> bool {
        self.mount_enabled
    }

    pub fn is_explicitly_declared(&self) -> bool {
        self.explicitly_declared
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn has_test_runner(&self) -> bool {
        self.test_runner
    }

    pub(crate) fn instantiate(&self) -> Instance {
        (self.factory)()
    }
}

/// `child` is mounted below `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountEdge {
    pub parent: ControllerId,
    pub child: ControllerId,
}
