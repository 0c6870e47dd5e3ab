//! Auth extractor for the thin HTTP surface.
//!
//! The core never decides who is permitted to do what — that's an upstream layer's job. This
//! extractor only reads the decision an upstream proxy already made and hands it to the handler
//! as a typed value.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use uuid::Uuid;

/// A pre-computed authorization decision, supplied by an upstream (out-of-scope) auth layer via
/// request headers. `permitted` gates every handler; `user_id` is carried through for audit
/// logging only.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    /// Whether the caller may perform the requested operation.
    pub permitted: bool,
    /// The authenticated caller, if the auth layer identified one.
    pub user_id: Option<Uuid>,
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let permitted = parts
            .headers
            .get("x-permitted")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok());
        Ok(Self { permitted, user_id })
    }
}
