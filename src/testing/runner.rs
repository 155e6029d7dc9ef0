use crate::dispatch::panic_message;
use crate::testing::{FixtureDescriptor, FixtureRegistry, Selection, StepFn};
use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use std::panic::AssertUnwindSafe;

/// Outcome of one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub fixture_key: String,
    pub fixture_desc: String,
    pub test_key: String,
    pub test_desc: String,
    pub passed: bool,
    pub message: String,
}

impl FixtureRegistry {
    /// Run the selected tests, or all of them.
    ///
    /// Fixtures and tests run in selection order. Unknown fixture hashes and
    /// test keys are skipped, as are tests not set to `true`.
    pub async fn run(&self, selection: Option<&Selection>) -> Vec<TestResult> {
        let everything;
        let selection = match selection {
            Some(selection) => selection,
            None => {
                everything = self.metadata();
                &everything
            }
        };

        let mut results = Vec::new();
        for (hash, tests) in selection {
            let Some(fixture) = self.by_hash(hash) else {
                tracing::debug!(fixture = %hash, "unknown fixture in test selection");
                continue;
            };
            let keys: Vec<&String> = tests
                .iter()
                .filter(|&(key, selected)| *selected && fixture.tests.contains_key(key))
                .map(|(key, _)| key)
                .collect();
            results.extend(run_fixture(fixture, hash, &keys).await);
        }

        let failed = results.iter().filter(|r| !r.passed).count();
        tracing::info!(total = results.len(), failed, "test run finished");
        results
    }
}

async fn run_fixture(fixture: &FixtureDescriptor, hash: &str, keys: &[&String]) -> Vec<TestResult> {
    let instance = (fixture.factory)();

    let mut setup_failure = None;
    for step in &fixture.before {
        if let Err(message) = run_step(step, instance.clone()).await {
            setup_failure = Some(format!("before hook failed: {message}"));
            break;
        }
    }

    let mut results = Vec::with_capacity(keys.len());
    for &key in keys {
        let test = &fixture.tests[key];
        let outcome = match &setup_failure {
            Some(message) => Err(message.clone()),
            None => run_step(&test.run, instance.clone()).await,
        };
        if let Err(message) = &outcome {
            tracing::warn!(fixture = fixture.name(), test = %key, "test failed: {}", message);
        }
        results.push(TestResult {
            fixture_key: hash.to_string(),
            fixture_desc: fixture.name.clone(),
            test_key: key.clone(),
            test_desc: test.name.clone(),
            passed: outcome.is_ok(),
            message: outcome.err().unwrap_or_default(),
        });
    }

    for step in &fixture.after {
        if let Err(message) = run_step(step, instance.clone()).await {
            tracing::warn!(fixture = fixture.name(), "after hook failed: {}", message);
        }
    }

    results
}

/// Errors and panics both become a serialized failure message.
async fn run_step(step: &StepFn, instance: super::FixtureInstance) -> Result<(), String> {
    match AssertUnwindSafe(step(instance)).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(json!({ "name": "Error", "message": format!("{err:#}") }).to_string()),
        Err(payload) => {
            Err(json!({ "name": "Panic", "message": panic_message(payload.as_ref()) }).to_string())
        }
    }
}
