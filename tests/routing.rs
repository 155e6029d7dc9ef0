mod common;

use arbor::diagnostics::DiagnosticKind;
use arbor::prelude::*;
use common::send;
use serde_json::json;

#[derive(Default)]
struct WidgetsController;

#[derive(Default)]
struct PartsController;

#[derive(Default)]
struct BoltsController;

#[derive(Default)]
struct AdminController;

#[derive(Default)]
struct AdminUsersController;

#[derive(Default)]
struct LegacyController;

struct ShopModule;

impl Module for ShopModule {
    fn register(registry: &mut Registry) -> arbor::Result<()> {
        // The child is registered before its parent on purpose.
        registry
            .controller::<BoltsController>()
            .under_at::<PartsController>("/bolts")
            .action("count", |a| a.get("/count").handle_sync(|_this, _ctx, _args| Ok(json!({ "bolts": 12 }))));

        registry
            .controller::<PartsController>()
            .under_at::<WidgetsController>("/parts")
            .action("show", |a| {
                a.get("/{id}")
                    .from_path(1, "id")
                    .handle(|_this, _ctx, args| async move { Ok(json!({ "part": args.str(1) })) })
            });

        registry
            .controller::<WidgetsController>()
            .at("/widgets")
            .middleware(LoggingInterceptor::named("widgets"))
            .action("find", |a| {
                a.get("/find")
                    .from_query(1, "value")
                    .handle(|_this, _ctx, args| async move { Ok(json!({ "value": args.get(1) })) })
            })
            .action("create", |a| {
                a.post("/")
                    .from_body(1, "name")
                    .handle(|_this, _ctx, args| async move { Ok(json!({ "created": args.str(1) })) })
            });
        Ok(())
    }
}

struct AdminModule;

impl Module for AdminModule {
    fn register(registry: &mut Registry) -> arbor::Result<()> {
        registry
            .controller::<AdminController>()
            .at("/admin")
            .condition(false)
            .action("home", |a| a.get("/").handle_sync(|_this, _ctx, _args| Ok("admin")));
        registry
            .controller::<AdminUsersController>()
            .under_at::<AdminController>("/users")
            .action("list", |a| a.get("/list").handle_sync(|_this, _ctx, _args| Ok(json!([]))));
        Ok(())
    }
}

fn build(environment: Environment, root: &str) -> Application {
    common::init_tracing();
    Application::builder()
        .environment(environment)
        .root(root)
        .module::<ShopModule>("controllers")
        .module::<AdminModule>("controllers")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_query_parameter_is_bound() {
    let app = build(Environment::Production, "/");
    let reply = send(&app.router(), Method::GET, "/widgets/find?value=42").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "value": "42" }));
}

#[tokio::test]
async fn test_missing_query_parameter_is_null() {
    let app = build(Environment::Production, "/");
    let reply = send(&app.router(), Method::GET, "/widgets/find").await;

    assert_eq!(reply.json(), json!({ "value": null }));
}

#[tokio::test]
async fn test_nested_controllers_are_routed_below_their_parents() {
    let app = build(Environment::Production, "/");
    let router = app.router();

    let reply = send(&router, Method::GET, "/widgets/parts/7").await;
    assert_eq!(reply.json(), json!({ "part": "7" }));

    let reply = send(&router, Method::GET, "/widgets/parts/bolts/count").await;
    assert_eq!(reply.json(), json!({ "bolts": 12 }));

    assert_eq!(app.controller_path::<BoltsController>(), Some("/widgets/parts/bolts"));
}

#[tokio::test]
async fn test_controller_without_trailing_slash_redirects() {
    let app = build(Environment::Production, "/");
    let router = app.router();

    let reply = send(&router, Method::GET, "/widgets/parts").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location(), "/widgets/parts/");

    let reply = send(&router, Method::GET, "/widgets/parts?page=2").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location(), "/widgets/parts/?page=2");
}

#[tokio::test]
async fn test_action_at_controller_root_is_reached_through_redirect() {
    let app = build(Environment::Production, "/");
    let router = app.router();

    let reply = send(&router, Method::POST, "/widgets").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location(), "/widgets/");

    let reply = common::send_json(&router, Method::POST, "/widgets/", &json!({ "name": "sprocket" })).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "created": "sprocket" }));
}

#[tokio::test]
async fn test_trailing_slash_alias() {
    let app = build(Environment::Production, "/");
    let reply = send(&app.router(), Method::GET, "/widgets/find/?value=1").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "value": "1" }));
}

#[tokio::test]
async fn test_wrong_method_and_unknown_path() {
    let app = build(Environment::Production, "/");
    let router = app.router();

    let reply = send(&router, Method::DELETE, "/widgets/find").await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);

    let reply = send(&router, Method::GET, "/nowhere").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_disabled_controller_hides_its_subtree() {
    let app = build(Environment::Production, "/");
    let router = app.router();

    assert_eq!(send(&router, Method::GET, "/admin/").await.status, StatusCode::NOT_FOUND);
    assert_eq!(send(&router, Method::GET, "/admin/users/list").await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.controller_path::<AdminController>(), None);
    assert_eq!(app.controller_path::<AdminUsersController>(), None);
    assert_eq!(app.action_route::<AdminController>("home", None), "");
    assert_eq!(app.action_route::<AdminUsersController>("list", None), "");
    assert!(
        app.diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::DisabledController && d.message.contains("AdminController"))
    );
}

#[tokio::test]
async fn test_root_path_prefixes_everything() {
    let app = build(Environment::Production, "/api");
    let router = app.router();

    let reply = send(&router, Method::GET, "/api/widgets/parts/3").await;
    assert_eq!(reply.json(), json!({ "part": "3" }));
    assert_eq!(send(&router, Method::GET, "/widgets/parts/3").await.status, StatusCode::NOT_FOUND);

    assert_eq!(app.root_path(), "/api");
    assert_eq!(app.action_route::<WidgetsController>("find", None), "/api/widgets/find");
}

#[tokio::test]
async fn test_action_route_matches_registered_route() {
    let app = build(Environment::Production, "/");

    let find = app.action_route::<WidgetsController>("find", None);
    assert_eq!(find, "/widgets/find");
    assert!(
        app.routes()
            .iter()
            .any(|route| route.path == find && route.method == Method::GET && route.action == "find")
    );

    assert_eq!(app.action_route::<WidgetsController>("create", Some(&Method::POST)), "/widgets/");
    assert_eq!(app.action_route::<WidgetsController>("create", Some(&Method::GET)), "");
    assert_eq!(app.action_route::<WidgetsController>("missing", None), "");
    assert_eq!(app.action_route::<PartsController>("show", None), "/widgets/parts/{id}");
}

#[tokio::test]
async fn test_action_without_route_falls_back_to_its_name() {
    common::init_tracing();
    let app = Application::builder()
        .environment(Environment::Production)
        .root("/")
        .group("controllers", |registry| {
            registry
                .controller::<LegacyController>()
                .at("/legacy")
                .action("ping", |a| a.handle_sync(|_this, _ctx, _args| Ok("pong")));
            Ok(())
        })
        .build()
        .unwrap();

    let reply = send(&app.router(), Method::GET, "/legacy/ping").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "pong");
    assert!(
        app.diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::UndeclaredAction && d.message.contains("ping"))
    );
}

#[tokio::test]
async fn test_development_index_pages() {
    let app = build(Environment::Development, "/");
    let router = app.router();

    let reply = send(&router, Method::GET, "/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("./widgets/"));

    let reply = send(&router, Method::GET, "/widgets/parts/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("./bolts/"));
    assert!(reply.body.contains("[GET]"));

    let app = build(Environment::Production, "/");
    let reply = send(&app.router(), Method::GET, "/widgets/parts/").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mount_keeps_host_routes() {
    let app = build(Environment::Production, "/");
    let host = Router::new()
        .route("/health", arbor::axum::routing::get(|| async { "up" }))
        .layer(tower_http::trace::TraceLayer::new_for_http());
    let router = app.mount(host);

    assert_eq!(send(&router, Method::GET, "/health").await.body, "up");
    assert_eq!(send(&router, Method::GET, "/widgets/parts/1").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_docs_describe_the_tree() {
    let app = build(Environment::Production, "/");
    let docs = app.docs();

    let widgets = docs.iter().find(|doc| doc.name == "WidgetsController").unwrap();
    assert_eq!(widgets.path, "/widgets");
    assert_eq!(widgets.children.len(), 1);
    assert_eq!(widgets.children[0].name, "PartsController");
    assert!(arbor::is_initialized());
}
