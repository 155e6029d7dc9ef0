//! Mount tree assembly.
//!
//! Turns the flat registry plus its mount edges into a forest. Roots are the
//! controllers nobody mounts; every other controller hangs below its single
//! parent. Full paths are computed top-down once the shape is known.

use crate::common::url_join;
use crate::controller::{ControllerId, Registry};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{ArborError, Result};
use std::collections::HashMap;

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct TreeNode {
    controller: ControllerId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    full_path: String,
}

impl TreeNode {
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Root path joined with every ancestor's mount path and this node's own.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }
}

#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
    index: HashMap<ControllerId, NodeId>,
}

impl Forest {
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    /// The tree node of a controller, if it was reached from a root.
    pub fn node_of(&self, controller: &ControllerId) -> Option<&TreeNode> {
        self.index.get(controller).map(|&id| &self.nodes[id])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recompute every full path below `root_path`.
    pub fn rebase(&mut self, registry: &Registry, root_path: &str) {
        let mut stack: Vec<(NodeId, String)> = self
            .roots
            .iter()
            .map(|&id| (id, root_path.to_string()))
            .collect();

        while let Some((id, base)) = stack.pop() {
            let mount_path = registry
                .get(&self.nodes[id].controller)
                .map(|descriptor| descriptor.mount_path())
                .unwrap_or("/");
            let full_path = url_join(&[base.as_str(), "/", mount_path]);
            for &child in &self.nodes[id].children {
                stack.push((child, full_path.clone()));
            }
            self.nodes[id].full_path = full_path;
        }
    }

    fn attach(&mut self, registry: &Registry, controller: ControllerId, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            controller,
            parent,
            children: Vec::new(),
            full_path: String::new(),
        });
        self.index.insert(controller, id);

        for edge in registry.edges().iter().filter(|edge| edge.parent == controller) {
            if registry.contains(&edge.child) && !self.index.contains_key(&edge.child) {
                let child = self.attach(registry, edge.child, Some(id));
                self.nodes[id].children.push(child);
            }
        }
        id
    }
}

/// Build the forest of everything registered, with full paths relative to `/`.
///
/// A controller mounted under more than one parent is a configuration error.
/// Children that no root reaches are reported and left out.
pub fn build_forest(registry: &Registry, diagnostics: &mut Diagnostics) -> Result<Forest> {
    let mut parents: HashMap<ControllerId, Vec<ControllerId>> = HashMap::new();
    for edge in registry.edges() {
        parents.entry(edge.child).or_default().push(edge.parent);
    }
    for descriptor in registry.controllers() {
        if let Some(declared) = parents.get(&descriptor.id()) {
            if declared.len() > 1 {
                return Err(ArborError::MultipleParents {
                    child: descriptor.name().to_string(),
                    parents: declared
                        .iter()
                        .map(ControllerId::short_name)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }
    }

    let mut forest = Forest::default();
    for descriptor in registry.controllers().filter(|d| !d.is_child()) {
        let root = forest.attach(registry, descriptor.id(), None);
        forest.roots.push(root);
    }

    for descriptor in registry.controllers().filter(|d| d.is_child()) {
        if forest.index.contains_key(&descriptor.id()) {
            continue;
        }
        let parent = parents
            .get(&descriptor.id())
            .and_then(|declared| declared.first())
            .copied();
        match parent {
            Some(parent) if !registry.contains(&parent) => diagnostics.warn(
                DiagnosticKind::OrphanedController,
                format!(
                    "Controller {} is mounted under {}, which is not a registered controller; it will not be routed",
                    descriptor.name(),
                    parent.short_name()
                ),
            ),
            _ => diagnostics.warn(
                DiagnosticKind::UnreachableController,
                format!(
                    "Controller {} cannot be reached from any root controller (mount cycle?); it will not be routed",
                    descriptor.name()
                ),
            ),
        }
    }

    forest.rebase(registry, "/");
    Ok(forest)
}
