//! Documentation tree of the mounted controllers, for external renderers.

use crate::common::url_join;
use crate::controller::{ControllerDescriptor, ResponseDoc};
use crate::controller::Registry;
use crate::tree::{Forest, NodeId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerDoc {
    pub name: String,
    pub doc: String,
    pub path: String,
    pub mounted: bool,
    pub actions: Vec<ActionDoc>,
    pub children: Vec<ControllerDoc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDoc {
    pub name: String,
    pub doc: String,
    pub mountpoints: Vec<MountpointDoc>,
    pub responses: BTreeMap<u16, ResponseDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountpointDoc {
    pub method: String,
    pub path: String,
}

/// One entry per root controller, children nested. Disabled controllers are
/// listed with `mounted: false`.
pub fn document(registry: &Registry, forest: &Forest) -> Vec<ControllerDoc> {
    forest
        .roots()
        .iter()
        .filter_map(|&root| document_node(registry, forest, root, true))
        .collect()
}

fn document_node(
    registry: &Registry,
    forest: &Forest,
    id: NodeId,
    parent_mounted: bool,
) -> Option<ControllerDoc> {
    let node = forest.node(id);
    let descriptor = registry.get(&node.controller())?;
    let mounted = parent_mounted && descriptor.mount_enabled();

    Some(ControllerDoc {
        name: descriptor.name().to_string(),
        doc: descriptor.doc().to_string(),
        path: node.full_path().to_string(),
        mounted,
        actions: document_actions(descriptor, node.full_path()),
        children: node
            .children()
            .iter()
            .filter_map(|&child| document_node(registry, forest, child, mounted))
            .collect(),
    })
}

fn document_actions(descriptor: &ControllerDescriptor, full_path: &str) -> Vec<ActionDoc> {
    descriptor
        .actions()
        .iter()
        .map(|(name, action)| ActionDoc {
            name: name.clone(),
            doc: action.doc().to_string(),
            mountpoints: action
                .effective_mountpoints(name)
                .into_iter()
                .map(|mountpoint| MountpointDoc {
                    method: mountpoint.method.to_string(),
                    path: url_join(&[full_path, "/", mountpoint.path.as_str()]),
                })
                .collect(),
            responses: action.responses().clone(),
        })
        .collect()
}
