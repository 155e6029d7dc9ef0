mod common;

use arbor::config::ConfigService;
use arbor::diagnostics::DiagnosticKind;
use arbor::prelude::*;
use common::send;

#[derive(Default)]
struct UsersController;

#[derive(Default)]
struct OrdersController;

#[derive(Default)]
struct InvoicesController;

#[derive(Default)]
struct StrayController;

fn builder() -> ApplicationBuilder {
    common::init_tracing();
    Application::builder().environment(Environment::Production).root("/")
}

#[test]
fn test_binding_position_zero_is_rejected() {
    let result = builder()
        .group("controllers", |registry| {
            registry.controller::<UsersController>().at("/users").action("find", |a| {
                a.get("/find")
                    .from_query(0, "id")
                    .handle_sync(|_this, _ctx, _args| Ok("found"))
            });
            Ok(())
        })
        .build();

    assert!(matches!(
        result,
        Err(ArborError::ReservedContextSlot { ref controller, ref action })
            if controller == "UsersController" && action == "find"
    ));
}

#[test]
fn test_binding_position_past_the_limit_is_rejected() {
    let result = builder()
        .group("controllers", |registry| {
            registry.controller::<UsersController>().at("/users").action("find", |a| {
                a.get("/find")
                    .from_query(1, "id")
                    .from_query(usize::MAX, "page")
                    .handle_sync(|_this, _ctx, _args| Ok("found"))
            });
            Ok(())
        })
        .build();

    assert!(matches!(
        result,
        Err(ArborError::BindingOutOfRange { position, max, .. })
            if position == usize::MAX && max == arbor::dispatch::MAX_POSITION
    ));
}

#[test]
fn test_colon_capture_is_rejected() {
    let result = builder()
        .group("controllers", |registry| {
            registry
                .controller::<UsersController>()
                .at("/users")
                .action("show", |a| a.get("/:id").handle_sync(|_this, _ctx, _args| Ok("show")));
            Ok(())
        })
        .build();

    match result {
        Err(ArborError::InvalidPath { path, owner, reason }) => {
            assert_eq!(path, "/users/:id");
            assert_eq!(owner, "action UsersController::show");
            assert!(reason.contains("{id}"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("build should fail"),
    }
}

#[test]
fn test_malformed_route_templates_are_rejected() {
    for template in ["/{id", "/files/{*rest}/meta", "/{}", "/*rest"] {
        let result = builder()
            .group("controllers", move |registry| {
                registry
                    .controller::<UsersController>()
                    .at("/users")
                    .action("show", |a| a.get(template).handle_sync(|_this, _ctx, _args| Ok("show")));
                Ok(())
            })
            .build();

        assert!(
            matches!(result, Err(ArborError::InvalidPath { .. })),
            "template {template} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_catch_all_route_is_accepted() {
    let app = builder()
        .group("controllers", |registry| {
            registry
                .controller::<UsersController>()
                .at("/files")
                .action("read", |a| {
                    a.get("/{*rest}")
                        .from_path(1, "rest")
                        .handle_sync(|_this, _ctx, args| Ok(args.str(1).unwrap_or_default().to_string()))
                });
            Ok(())
        })
        .build()
        .unwrap();

    let reply = send(&app.router(), Method::GET, "/files/docs/readme.md").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "docs/readme.md");
}

#[test]
fn test_colon_in_mount_path_is_rejected() {
    let result = builder()
        .group("controllers", |registry| {
            registry.controller::<OrdersController>().at("/orders/:tenant");
            Ok(())
        })
        .build();

    assert!(matches!(
        result,
        Err(ArborError::InvalidPath { ref owner, .. }) if owner == "controller OrdersController"
    ));
}

#[test]
fn test_controller_with_two_parents_is_rejected() {
    let result = builder()
        .group("controllers", |registry| {
            registry.controller::<UsersController>().at("/users");
            registry.controller::<OrdersController>().at("/orders");
            registry.controller::<InvoicesController>().under::<UsersController>();
            registry.controller::<InvoicesController>().under::<OrdersController>();
            Ok(())
        })
        .build();

    assert!(matches!(result, Err(ArborError::MultipleParents { ref child, .. }) if child == "InvoicesController"));
}

#[test]
fn test_duplicate_route_is_rejected() {
    let result = builder()
        .group("controllers", |registry| {
            registry
                .controller::<UsersController>()
                .at("/users")
                .action("first", |a| a.get("/{id}").handle_sync(|_this, _ctx, _args| Ok("one")))
                .action("second", |a| a.get("/{name}").handle_sync(|_this, _ctx, _args| Ok("two")));
            Ok(())
        })
        .build();

    assert!(matches!(
        result,
        Err(ArborError::DuplicateRoute { ref action, ref method, .. }) if action == "second" && method == "GET"
    ));
}

#[test]
fn test_same_path_different_methods_is_fine() {
    let app = builder()
        .group("controllers", |registry| {
            registry
                .controller::<UsersController>()
                .at("/users")
                .action("show", |a| a.get("/{id}").handle_sync(|_this, _ctx, _args| Ok("show")))
                .action("remove", |a| a.delete("/{id}").handle_sync(|_this, _ctx, _args| Ok("remove")));
            Ok(())
        })
        .build()
        .unwrap();

    assert_eq!(app.routes().len(), 2);
}

#[test]
fn test_action_without_handler_is_rejected() {
    let result = builder()
        .group("controllers", |registry| {
            registry.controller::<UsersController>().at("/users").action("find", |a| a.get("/find"));
            Ok(())
        })
        .build();

    assert!(matches!(result, Err(ArborError::MissingHandler { .. })));
}

#[test]
fn test_module_failure_halts_build() {
    let result = builder()
        .group("controllers", |_registry| Err(ArborError::module_failed("users module is broken")))
        .build();

    match result {
        Err(err) => assert!(err.to_string().contains("users module is broken")),
        Ok(_) => panic!("build should fail"),
    }
}

#[tokio::test]
async fn test_orphan_is_reported_and_not_routed() {
    let app = builder()
        .group("controllers", |registry| {
            registry
                .controller::<StrayController>()
                .under_at::<UsersController>("/stray")
                .action("ping", |a| a.get("/ping").handle_sync(|_this, _ctx, _args| Ok("pong")));
            Ok(())
        })
        .build()
        .unwrap();

    assert!(
        app.diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::OrphanedController && d.message.contains("StrayController"))
    );
    assert!(app.routes().is_empty());
    assert_eq!(send(&app.router(), Method::GET, "/stray/ping").await.status, StatusCode::NOT_FOUND);
}

#[test]
fn test_undeclared_parent_is_mounted_with_warning() {
    let app = builder()
        .group("controllers", |registry| {
            registry
                .controller::<InvoicesController>()
                .under_at::<OrdersController>("/invoices")
                .action("list", |a| a.get("/").handle_sync(|_this, _ctx, _args| Ok("[]")));
            // Touching the parent registers it without declaring it.
            registry
                .controller::<OrdersController>()
                .action("count", |a| a.get("/count").handle_sync(|_this, _ctx, _args| Ok("0")));
            Ok(())
        })
        .build()
        .unwrap();

    assert!(
        app.diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::UndeclaredController && d.message.contains("OrdersController"))
    );
    assert_eq!(app.controller_path::<OrdersController>(), Some("/OrdersController"));
    assert_eq!(
        app.action_route::<InvoicesController>("list", None),
        "/OrdersController/invoices/"
    );
}

#[test]
fn test_required_groups_are_loaded_and_missing_ones_reported() {
    let app = builder()
        .group("billing", |registry| {
            registry
                .controller::<InvoicesController>()
                .at("/invoices")
                .action("list", |a| a.get("/").handle_sync(|_this, _ctx, _args| Ok("[]")));
            Ok(())
        })
        .group("reporting", |registry| {
            registry.controller::<OrdersController>().at("/orders");
            Ok(())
        })
        .require("billing")
        .require("audit")
        .build()
        .unwrap();

    assert_eq!(app.controller_path::<InvoicesController>(), Some("/invoices"));
    // Registered but never required.
    assert_eq!(app.controller_path::<OrdersController>(), None);
    assert!(
        app.diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::MissingModule && d.message.contains("audit"))
    );
}

#[test]
fn test_environment_and_root_come_from_config() {
    let config = ConfigService::empty();
    config.set(arbor::config::ENV_KEY, "DEVELOPMENT");
    config.set(arbor::config::ROOT_KEY, "/v1/");

    let app = ApplicationBuilder::with_config(config)
        .group("controllers", |registry| {
            registry
                .controller::<UsersController>()
                .at("users")
                .action("me", |a| a.get("/me").handle_sync(|_this, _ctx, _args| Ok("me")));
            Ok(())
        })
        .build()
        .unwrap();

    assert!(app.environment().is_development());
    assert_eq!(app.root_path(), "/v1");
    assert_eq!(app.action_route::<UsersController>("me", None), "/v1/users/me");
    assert!(arbor::is_initialized());
}
