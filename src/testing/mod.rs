//! Test fixtures that run inside the application and are triggered over HTTP.
//!
//! A fixture is a `Default` type with optional before/after hooks and a set
//! of named tests. Controllers marked with
//! [`test_runner`](crate::controller::ControllerEntry::test_runner) expose the
//! runner routes.

mod routes;
mod runner;

pub(crate) use routes::test_runner_routes;
pub use runner::TestResult;

use crate::common::TypeIdentity;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Any default-constructible, shareable type can be a fixture. A fresh
/// instance is created for every run.
pub trait Fixture: Default + Send + Sync + 'static {}

impl<T> Fixture for T where T: Default + Send + Sync + 'static {}

/// Fixture hash id → test key → selected.
pub type Selection = IndexMap<String, IndexMap<String, bool>>;

type FixtureInstance = Arc<dyn Any + Send + Sync>;
type StepFn = Arc<dyn Fn(FixtureInstance) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

fn erase<F, T, Fut>(step: T) -> StepFn
where
    F: Fixture,
    T: Fn(Arc<F>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |instance: FixtureInstance| -> BoxFuture<'static, anyhow::Result<()>> {
        match instance.downcast::<F>() {
            Ok(fixture) => Box::pin(step(fixture)),
            Err(_) => Box::pin(async {
                Err(anyhow::anyhow!(
                    "fixture instance is not a `{}`",
                    std::any::type_name::<F>()
                ))
            }),
        }
    })
}

pub struct TestDescriptor {
    name: String,
    run: StepFn,
}

impl TestDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct FixtureDescriptor {
    id: TypeIdentity,
    factory: Arc<dyn Fn() -> FixtureInstance + Send + Sync>,
    name: String,
    explicitly_declared: bool,
    before: Vec<StepFn>,
    after: Vec<StepFn>,
    tests: IndexMap<String, TestDescriptor>,
}

impl FixtureDescriptor {
    /// Human readable name; the type name unless one was given.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_explicitly_declared(&self) -> bool {
        self.explicitly_declared
    }

    pub fn tests(&self) -> &IndexMap<String, TestDescriptor> {
        &self.tests
    }

    /// `<TypeName>_<first 8 hex digits of sha256(type path)>`: stable while
    /// the type keeps its path, opaque otherwise.
    pub fn hash_id(&self) -> String {
        let digest = Sha256::digest(self.id.type_name().as_bytes());
        let hex: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
        format!("{}_{}", self.id.short_name(), hex)
    }
}

#[derive(Default)]
pub struct FixtureRegistry {
    fixtures: IndexMap<TypeIdentity, FixtureDescriptor>,
}

impl FixtureRegistry {
    pub(crate) fn entry<F: Fixture>(&mut self) -> FixtureEntry<'_, F> {
        let id = TypeIdentity::of::<F>();
        self.fixtures.entry(id).or_insert_with(|| FixtureDescriptor {
            id,
            factory: Arc::new(|| -> FixtureInstance { Arc::new(F::default()) }),
            name: id.short_name().to_string(),
            explicitly_declared: false,
            before: Vec::new(),
            after: Vec::new(),
            tests: IndexMap::new(),
        });
        FixtureEntry {
            registry: self,
            id,
            _fixture: PhantomData,
        }
    }

    pub fn fixtures(&self) -> impl Iterator<Item = &FixtureDescriptor> {
        self.fixtures.values()
    }

    pub fn by_hash(&self, hash: &str) -> Option<&FixtureDescriptor> {
        self.fixtures.values().find(|fixture| fixture.hash_id() == hash)
    }

    /// Every known fixture and test, all selected.
    pub fn metadata(&self) -> Selection {
        self.fixtures
            .values()
            .map(|fixture| {
                let tests = fixture.tests.keys().map(|key| (key.clone(), true)).collect();
                (fixture.hash_id(), tests)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

/// Builder over the descriptor of fixture `F`.
pub struct FixtureEntry<'r, F> {
    registry: &'r mut FixtureRegistry,
    id: TypeIdentity,
    _fixture: PhantomData<fn() -> F>,
}

impl<F: Fixture> FixtureEntry<'_, F> {
    fn descriptor(&mut self) -> &mut FixtureDescriptor {
        &mut self.registry.fixtures[&self.id]
    }

    pub fn name(mut self, name: &str) -> Self {
        let descriptor = self.descriptor();
        descriptor.name = name.to_string();
        descriptor.explicitly_declared = true;
        self
    }

    /// Runs before the selected tests of a run. If it fails, every selected
    /// test of the fixture fails with its message.
    pub fn before<T, Fut>(mut self, step: T) -> Self
    where
        T: Fn(Arc<F>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.descriptor().before.push(erase::<F, _, _>(step));
        self
    }

    /// Runs after the selected tests of a run, whatever their outcome.
    pub fn after<T, Fut>(mut self, step: T) -> Self
    where
        T: Fn(Arc<F>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.descriptor().after.push(erase::<F, _, _>(step));
        self
    }

    /// A test passes unless it returns an error or panics.
    pub fn test<T, Fut>(mut self, key: &str, name: &str, test: T) -> Self
    where
        T: Fn(Arc<F>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.descriptor().tests.insert(
            key.to_string(),
            TestDescriptor {
                name: name.to_string(),
                run: erase::<F, _, _>(test),
            },
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MathFixture;

    mod other {
        #[derive(Default)]
        pub struct MathFixture;
    }

    #[test]
    fn test_hash_id_is_stable_and_distinct() {
        let mut first = FixtureRegistry::default();
        first.entry::<MathFixture>();
        let mut second = FixtureRegistry::default();
        second.entry::<MathFixture>();
        second.entry::<other::MathFixture>();

        let hashes: Vec<String> = second.fixtures().map(FixtureDescriptor::hash_id).collect();
        assert_eq!(first.fixtures().next().unwrap().hash_id(), hashes[0]);
        assert_ne!(hashes[0], hashes[1]);
        assert!(hashes[0].starts_with("MathFixture_"));
        assert_eq!(hashes[0].len(), "MathFixture_".len() + 8);
    }

    #[test]
    fn test_metadata_lists_every_test() {
        let mut registry = FixtureRegistry::default();
        registry
            .entry::<MathFixture>()
            .name("Math")
            .test("adds", "adds numbers", |_f| async { Ok(()) })
            .test("subtracts", "subtracts numbers", |_f| async { Ok(()) });

        let fixture = registry.fixtures().next().unwrap();
        assert_eq!(fixture.name(), "Math");
        assert!(fixture.is_explicitly_declared());

        let metadata = registry.metadata();
        let tests = &metadata[&fixture.hash_id()];
        assert_eq!(tests.keys().collect::<Vec<_>>(), vec!["adds", "subtracts"]);
        assert!(tests.values().all(|selected| *selected));
        assert!(registry.by_hash(&fixture.hash_id()).is_some());
    }
}
