use crate::testing::{FixtureRegistry, Selection, TestResult};
use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get, post},
};
use std::sync::Arc;

fn respond(results: Vec<TestResult>) -> Response {
    let status = if results.iter().any(|result| !result.passed) {
        StatusCode::IM_A_TEAPOT
    } else {
        StatusCode::OK
    };
    (status, Json(results)).into_response()
}

/// Runner routes, relative to the controller that hosts them.
pub(crate) fn test_runner_routes(fixtures: Arc<FixtureRegistry>) -> Vec<(Method, String, MethodRouter)> {
    let mut routes = Vec::new();

    let all = Arc::clone(&fixtures);
    routes.push((
        Method::GET,
        "/all".to_string(),
        get(move || async move { respond(all.run(None).await) }),
    ));

    let some = Arc::clone(&fixtures);
    routes.push((
        Method::POST,
        "/some".to_string(),
        post(move |Json(selection): Json<Selection>| async move {
            respond(some.run(Some(&selection)).await)
        }),
    ));

    let metadata = Arc::clone(&fixtures);
    routes.push((
        Method::GET,
        "/metadata".to_string(),
        get(move || async move { Json(metadata.metadata()) }),
    ));

    for fixture in fixtures.fixtures() {
        let hash = fixture.hash_id();
        let registry = Arc::clone(&fixtures);
        let path = format!("/fixture/{hash}/all");
        routes.push((
            Method::GET,
            path,
            get(move || async move {
                let mut selection = registry.metadata();
                selection.retain(|key, _| *key == hash);
                respond(registry.run(Some(&selection)).await)
            }),
        ));
    }

    routes
}
