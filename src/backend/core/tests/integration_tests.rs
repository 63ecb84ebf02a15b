//! End-to-end tests: storage read-through, session snapshots and the HTTP
//! access layer working together.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower::ServiceExt;

use lectern_core::config::Config;
use lectern_core::error::ErrorCode;
use lectern_core::rbac::{
    AccessContext, AccessRequest, AuthorizationGate, InMemoryUserStore, Operation, PrivilegedUser,
    ProjectSlug, RequireAccessLayer, ResourceId, User, UserId, UserKind, UserLoader, UserStore,
    VisibilityOptions,
};
use lectern_core::AccessEngine;

// ============================================================================
// Test Utilities
// ============================================================================

fn session_config() -> Config {
    let mut config = Config::default();
    config.session.secret = Some("integration-secret".to_string());
    config
}

type Users = Arc<HashMap<String, User>>;

/// Stand-in for upstream authentication: maps `x-user` to a loaded user.
async fn authenticate(State(users): State<Users>, mut request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get("x-user")
        .and_then(|v| v.to_str().ok())
        .and_then(|id| users.get(id).cloned());
    if let Some(user) = user {
        request.extensions_mut().insert(AccessContext::new(user));
    }
    next.run(request).await
}

async fn whoami(context: AccessContext) -> String {
    context.user.id().to_string()
}

fn app(engine: &AccessEngine, users: Users) -> Router {
    let require = |resource, operation| {
        RequireAccessLayer::new(engine.gate().clone(), resource, operation)
    };
    Router::new()
        .route(
            "/articles",
            get(whoami).route_layer(require(ResourceId::Articles, Operation::Read)),
        )
        .route(
            "/articles/translate",
            get(whoami).route_layer(require(ResourceId::Articles, Operation::Translate)),
        )
        .route(
            "/settings",
            get(whoami).route_layer(require(ResourceId::Settings, Operation::Update)),
        )
        .layer(middleware::from_fn_with_state(users, authenticate))
}

fn translates_in(gate: &AuthorizationGate, user: &User, locale: &str) -> bool {
    let request =
        AccessRequest::new(ResourceId::Articles, Operation::Translate).with_locale(locale);
    gate.has_permission_in(Some(user), &request)
}

async fn status(app: &Router, uri: &str, user: Option<&str>, locale: Option<&str>) -> StatusCode {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user", user);
    }
    if let Some(locale) = locale {
        builder = builder.header("x-content-locale", locale);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

// ============================================================================
// Read-through + Session
// ============================================================================

#[tokio::test]
async fn test_role_change_visible_on_next_read_but_not_in_session() {
    let config = session_config();
    let engine = AccessEngine::from_config(&config).unwrap();
    let codec = AccessEngine::session_codec(&config).unwrap();
    let store = InMemoryUserStore::new();
    let loader = UserLoader::new(store.clone(), engine.gate().cache().clone());
    let id = UserId::new("writer");

    store
        .save(
            PrivilegedUser::new("writer", UserKind::Standard)
                .with_roles(["alpha-manager"])
                .with_current_project(ProjectSlug::Alpha)
                .into(),
        )
        .await
        .unwrap();

    // Login: snapshot the freshly materialised permissions.
    let user = loader.load_required(&id).await.unwrap();
    let token = codec
        .encode(&codec.issue_from_cache(engine.gate().cache(), &user).unwrap())
        .unwrap();

    // Demote the user in storage.
    store
        .save(
            PrivilegedUser::new("writer", UserKind::Standard)
                .with_roles(["viewer"])
                .into(),
        )
        .await
        .unwrap();

    let reloaded = loader.load_required(&id).await.unwrap();
    assert!(!engine
        .gate()
        .has_permission(Some(&reloaded), ResourceId::Articles, Operation::Delete, None));

    let in_session = codec.restore(&token, reloaded).unwrap();
    assert!(engine
        .gate()
        .has_permission(Some(&in_session), ResourceId::Articles, Operation::Delete, None));
}

#[tokio::test]
async fn test_locale_reassignment_waits_for_next_session() {
    let config = session_config();
    let engine = AccessEngine::from_config(&config).unwrap();
    let codec = AccessEngine::session_codec(&config).unwrap();
    let store = InMemoryUserStore::new();
    let loader = UserLoader::new(store.clone(), engine.gate().cache().clone());
    let id = UserId::new("linguist");

    store
        .save(
            PrivilegedUser::new("linguist", UserKind::Standard)
                .with_locale_roles("fr", ["translator"])
                .into(),
        )
        .await
        .unwrap();

    let user = loader.load_required(&id).await.unwrap();
    let token = codec
        .encode(&codec.issue_from_cache(engine.gate().cache(), &user).unwrap())
        .unwrap();

    // Move translation rights from fr to de in storage.
    store
        .save(
            PrivilegedUser::new("linguist", UserKind::Standard)
                .with_locale_roles("de", ["translator"])
                .with_locale_roles("fr", ["viewer"])
                .into(),
        )
        .await
        .unwrap();

    let gate = engine.gate();
    let reloaded = loader.load_required(&id).await.unwrap();
    assert!(!translates_in(gate, &reloaded, "fr"));
    assert!(translates_in(gate, &reloaded, "de"));

    let in_session = codec.restore(&token, reloaded).unwrap();
    assert!(translates_in(gate, &in_session, "fr"));
    assert!(!translates_in(gate, &in_session, "de"));
}

#[tokio::test]
async fn test_project_selection_through_engine() {
    let engine = AccessEngine::builtin().unwrap();
    let store = InMemoryUserStore::new();
    store.insert(
        PrivilegedUser::new("mgr", UserKind::Standard)
            .with_roles(["beta-manager"])
            .into(),
    );
    let loader = UserLoader::new(store, engine.gate().cache().clone());
    let mut user = loader.load_required(&UserId::new("mgr")).await.unwrap();
    let permissions = engine.resolve(&user);

    let err = engine
        .projects()
        .select(&mut user, Some(ProjectSlug::Alpha), &permissions)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProjectNotPermitted);

    engine
        .projects()
        .select(&mut user, Some(ProjectSlug::Beta), &permissions)
        .unwrap();

    let hidden_in = |project: ProjectSlug| {
        engine.visibility().is_hidden(
            ResourceId::Redirects,
            &[project],
            &VisibilityOptions::default(),
            Some(&user),
        )
    };
    assert!(!hidden_in(ProjectSlug::Beta));
    assert!(hidden_in(ProjectSlug::Gamma));
}

// ============================================================================
// HTTP Access Layer
// ============================================================================

#[tokio::test]
async fn test_router_enforces_access() {
    let engine = AccessEngine::builtin().unwrap();
    let cache = engine.gate().cache();
    let users: Users = Arc::new(
        [
            cache.materialize(
                PrivilegedUser::new("viewer", UserKind::Standard)
                    .with_roles(["viewer"])
                    .into(),
            ),
            cache.materialize(PrivilegedUser::new("root", UserKind::Admin).into()),
            cache.materialize(
                PrivilegedUser::new("fr-translator", UserKind::Standard)
                    .with_locale_roles("fr", ["translator"])
                    .into(),
            ),
        ]
        .into_iter()
        .map(|u| (u.id().to_string(), u))
        .collect(),
    );
    let app = app(&engine, users);

    assert_eq!(status(&app, "/articles", None, None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(status(&app, "/articles", Some("viewer"), None).await, StatusCode::OK);
    assert_eq!(status(&app, "/settings", Some("viewer"), None).await, StatusCode::FORBIDDEN);
    assert_eq!(status(&app, "/settings", Some("root"), None).await, StatusCode::OK);

    assert_eq!(
        status(&app, "/articles/translate", Some("fr-translator"), Some("fr")).await,
        StatusCode::OK
    );
    assert_eq!(
        status(&app, "/articles/translate", Some("fr-translator"), Some("de")).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status(&app, "/articles/translate", Some("viewer"), Some("fr")).await,
        StatusCode::FORBIDDEN
    );
}
