//! Axum middleware that turns the authorization gate into per-route access
//! callbacks.
//!
//! Upstream authentication materialises the user (through [`UserLoader`] or a
//! session restore) and inserts an [`AccessContext`] into the request
//! extensions. This layer then checks one fixed `(resource, operation)` pair.
//!
//! [`UserLoader`]: super::cache::UserLoader

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::warn;

use super::models::{Locale, Operation, ResourceId};
use super::policy::{AccessRequest, AuthorizationGate, PolicyDecision};
use super::user::User;
use crate::error::{ErrorCode, LecternError};

/// Header naming the content locale a write targets.
pub const CONTENT_LOCALE_HEADER: &str = "x-content-locale";

// ═══════════════════════════════════════════════════════════════════════════════
// Request Context
// ═══════════════════════════════════════════════════════════════════════════════

/// The materialised caller, inserted by upstream authentication.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub user: User,
}

impl AccessContext {
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

/// Document targeted by the request, for document-level grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTarget(pub String);

/// Record of the check that let the request through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedAccess {
    pub resource: ResourceId,
    pub operation: Operation,
}

/// Axum extractor for `AccessContext`.
#[axum::async_trait]
impl<S> FromRequestParts<S> for AccessContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessContext>()
            .cloned()
            .ok_or_else(unauthenticated)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that requires one operation on one resource.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/articles", post(create_article))
///     .route_layer(RequireAccessLayer::new(gate, ResourceId::Articles, Operation::Create));
/// ```
#[derive(Debug, Clone)]
pub struct RequireAccessLayer {
    gate: AuthorizationGate,
    resource: ResourceId,
    operation: Operation,
}

impl RequireAccessLayer {
    pub fn new(gate: AuthorizationGate, resource: ResourceId, operation: Operation) -> Self {
        Self {
            gate,
            resource,
            operation,
        }
    }
}

impl<S> Layer<S> for RequireAccessLayer {
    type Service = RequireAccessService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireAccessService {
            inner,
            gate: self.gate.clone(),
            resource: self.resource,
            operation: self.operation,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct RequireAccessService<S> {
    inner: S,
    gate: AuthorizationGate,
    resource: ResourceId,
    operation: Operation,
}

impl<S> Service<Request<Body>> for RequireAccessService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let resource = self.resource;
        let operation = self.operation;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(context) = request.extensions().get::<AccessContext>().cloned() else {
                return Ok(unauthenticated());
            };

            let mut access = AccessRequest::new(resource, operation);
            access.document_id = request
                .extensions()
                .get::<DocumentTarget>()
                .map(|d| d.0.clone());
            access.locale = content_locale(request.headers());

            if let PolicyDecision::Deny(reason) = gate.check(Some(&context.user), &access) {
                warn!(
                    user_id = %context.user.id(),
                    resource = %resource,
                    operation = %operation,
                    reason = %reason,
                    "Access denied"
                );
                return Ok(LecternError::with_internal(
                    ErrorCode::Forbidden,
                    format!("You may not {} {}", operation, resource),
                    reason,
                )
                .into_response());
            }

            request
                .extensions_mut()
                .insert(GrantedAccess { resource, operation });
            inner.call(request).await
        })
    }
}

fn content_locale(headers: &HeaderMap) -> Option<Locale> {
    headers
        .get(CONTENT_LOCALE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Locale::new)
}

fn unauthenticated() -> Response {
    LecternError::new(ErrorCode::Unauthorized, "Authentication required").into_response()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
