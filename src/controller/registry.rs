use crate::common::mount_path;
use crate::config::Environment;
use crate::controller::descriptor::{ControllerDescriptor, MountEdge};
use crate::controller::{Action, Controller, ControllerId, Instance};
use crate::interceptor::Interceptor;
use crate::testing::{Fixture, FixtureEntry, FixtureRegistry};
use indexmap::IndexMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Controller and fixture metadata, collected before the application is built.
///
/// Every lookup is get-or-insert, so registrations for one controller can be
/// spread over several modules and happen in any order. Iteration follows
/// first-touch order.
#[derive(Default)]
pub struct Registry {
    controllers: IndexMap<ControllerId, ControllerDescriptor>,
    edges: Vec<MountEdge>,
    fixtures: FixtureRegistry,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for controller `C`, creating its descriptor on first access.
    pub fn controller<C: Controller>(&mut self) -> ControllerEntry<'_, C> {
        self.get_or_insert::<C>();
        ControllerEntry {
            registry: self,
            id: ControllerId::of::<C>(),
            _controller: PhantomData,
        }
    }

    pub fn get_or_insert<C: Controller>(&mut self) -> &mut ControllerDescriptor {
        let id = ControllerId::of::<C>();
        self.controllers.entry(id).or_insert_with(|| {
            ControllerDescriptor::new(
                id,
                Arc::new(|| -> Instance { Arc::new(C::default()) }),
            )
        })
    }

    /// Mount `C` below `P`. Marks `C` as a child; `P` is not created here,
    /// so a parent that is never registered leaves `C` orphaned.
    pub fn register_mount_point<P: Controller, C: Controller>(&mut self) {
        self.get_or_insert::<C>().is_child = true;
        self.edges.push(MountEdge {
            parent: ControllerId::of::<P>(),
            child: ControllerId::of::<C>(),
        });
    }

    pub fn get(&self, id: &ControllerId) -> Option<&ControllerDescriptor> {
        self.controllers.get(id)
    }

    pub fn contains(&self, id: &ControllerId) -> bool {
        self.controllers.contains_key(id)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &ControllerDescriptor> {
        self.controllers.values()
    }

    pub fn edges(&self) -> &[MountEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Entry for test fixture `F`, creating it on first access.
    pub fn fixture<F: Fixture>(&mut self) -> FixtureEntry<'_, F> {
        self.fixtures.entry::<F>()
    }

    pub fn fixtures(&self) -> &FixtureRegistry {
        &self.fixtures
    }

    pub(crate) fn take_fixtures(&mut self) -> FixtureRegistry {
        std::mem::take(&mut self.fixtures)
    }
}

/// Builder over the descriptor of controller `C`.
pub struct ControllerEntry<'r, C> {
    registry: &'r mut Registry,
    id: ControllerId,
    _controller: PhantomData<fn() -> C>,
}

impl<C: Controller> ControllerEntry<'_, C> {
    fn descriptor(&mut self) -> &mut ControllerDescriptor {
        self.registry.get_or_insert::<C>()
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    /// Declare `C` as a controller mounted at its type name.
    pub fn declare(mut self) -> Self {
        self.descriptor().explicitly_declared = true;
        self
    }

    /// Declare `C` as a controller mounted at `path`.
    pub fn at(mut self, path: &str) -> Self {
        let descriptor = self.descriptor();
        descriptor.explicitly_declared = true;
        descriptor.mount_path = mount_path(path);
        self
    }

    /// Declare `C` as a child of `P`, mounted at its type name.
    pub fn under<P: Controller>(mut self) -> Self {
        self.registry.register_mount_point::<P, C>();
        self.descriptor().explicitly_declared = true;
        self
    }

    /// Declare `C` as a child of `P`, mounted at `path` below it.
    pub fn under_at<P: Controller>(mut self, path: &str) -> Self {
        self.registry.register_mount_point::<P, C>();
        self.at(path)
    }

    /// Wraps every route of `C` and of its descendants.
    pub fn middleware(mut self, interceptor: impl Interceptor) -> Self {
        self.descriptor().middleware.push(Arc::new(interceptor));
        self
    }

    /// Mount condition. Once any condition is false the controller and its
    /// whole subtree stay unrouted.
    pub fn condition(mut self, enabled: bool) -> Self {
        let descriptor = self.descriptor();
        descriptor.mount_enabled = descriptor.mount_enabled && enabled;
        self
    }

    /// Only mounted in development mode.
    pub fn dev_only(self, environment: Environment) -> Self {
        self.condition(environment.is_development())
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.descriptor().doc = doc.to_string();
        self
    }

    /// Graft the fixture runner routes (`/all`, `/some`, `/metadata`,
    /// `/fixture/<hash>/all`) into this controller.
    pub fn test_runner(mut self) -> Self {
        self.descriptor().test_runner = true;
        self
    }

    /// Add to (or create) the action called `name`.
    ///
    /// ```
    /// # use arbor::prelude::*;
    /// # #[derive(Default)]
    /// # struct Widgets;
    /// let mut registry = Registry::new();
    /// registry.controller::<Widgets>().at("/widgets").action("find", |a| {
    ///     a.get("/find")
    ///         .from_query(1, "value")
    ///         .handle(|_this, _ctx, args| async move {
    ///             Ok(json!({ "value": args.get(1) }))
    ///         })
    /// });
    /// ```
    pub fn action<F>(mut self, name: &str, build: F) -> Self
    where
        F: FnOnce(Action<C>) -> Action<C>,
    {
        let action = build(Action::new());
        let descriptor = self.descriptor();
        let entry = descriptor.actions.entry(name.to_string()).or_default();
        action.merge_into(entry);
        self
    }
}
