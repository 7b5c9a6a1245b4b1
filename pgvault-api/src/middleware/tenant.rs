//! Tenant-resolution middleware.
//!
//! Runs once per request ahead of every configuration route: resolves the
//! tenant and branch, attaches the caller identity forwarded by the upstream
//! authenticator, and runs the rest of the pipeline inside a
//! [`RequestContext`] scope that ends with the request.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use pgvault_security::access::RoleSet;
use pgvault_security::tenant::{Principal, RequestContext, RequestMeta, Session};
use std::convert::Infallible;
use std::sync::Arc;

use crate::session::SESSION_HEADER;
use crate::state::AppState;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's comma-separated roles.
pub const USER_ROLES_HEADER: &str = "x-user-roles";

struct HeaderMeta<'a>(&'a HeaderMap);

impl RequestMeta for HeaderMeta<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Builds the caller identity from forwarded headers.
///
/// Unknown role names are dropped; a missing or blank user id means no principal.
#[must_use]
pub fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())?;
    let roles = headers
        .get(USER_ROLES_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(RoleSet::parse_lenient)
        .unwrap_or_default();
    Some(Principal::new(user_id, roles))
}

/// Resolves the request context and scopes the remaining pipeline to it.
pub async fn tenant_context(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let principal = principal_from_headers(request.headers());
    let session = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|id| {
            let user = principal.as_ref().map(|p| p.user_id.as_str());
            state.sessions.handle(id, user)
        });

    if let (Some(session), Some(principal)) = (&session, &principal) {
        session.set(
            &state.resolver.settings().session_user_key,
            principal.user_id.clone(),
        );
    }

    let resolution = state
        .resolver
        .resolve(
            &HeaderMeta(request.headers()),
            session.as_ref().map(|s| s as &dyn Session),
        )
        .await;

    let ctx = RequestContext::new(resolution.context, principal);
    request.extensions_mut().insert(ctx.clone());
    ctx.scope(next.run(request)).await
}

/// Extractor for the resolved request context.
///
/// Falls back to an empty context outside the middleware, so tenant-scoped
/// operations fail with an illegal-state error rather than guessing.
#[derive(Debug, Clone)]
pub struct Ctx(pub RequestContext);

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<RequestContext>()
                .cloned()
                .or_else(RequestContext::current)
                .unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pgvault_security::access::Role;

    #[test]
    fn test_principal_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(principal_from_headers(&headers).is_none());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" olivia "));
        headers.insert(USER_ROLES_HEADER, HeaderValue::from_static("ROLE_OPS,unknown"));
        let principal = principal_from_headers(&headers).unwrap();
        assert_eq!(principal.user_id, "olivia");
        assert!(principal.roles.contains(Role::Ops));
        assert_eq!(principal.roles.iter().count(), 1);
    }

    #[test]
    fn test_blank_user_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert!(principal_from_headers(&headers).is_none());
    }
}
