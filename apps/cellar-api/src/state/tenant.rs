//! Tenant resolution.
//!
//! Sessions live outside this service. The tenant arrives in the
//! `X-Tenant-Id` header, falling back to the configured default.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use cellar_core::validation::validate_tenant_id;

use super::SharedState;
use crate::error::ApiError;

/// Header carrying the tenant id.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// The tenant a request acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant(pub String);

impl Tenant {
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Picks the header value when present, else `default`.
    pub fn resolve(header: Option<&str>, default: &str) -> Result<Self, ApiError> {
        let tenant = header.map(str::trim).unwrap_or(default);
        validate_tenant_id(tenant)?;
        Ok(Tenant(tenant.to_string()))
    }
}

impl FromRequestParts<SharedState> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(TENANT_HEADER) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| ApiError::validation("X-Tenant-Id must be visible ASCII"))?,
            ),
            None => None,
        };

        Tenant::resolve(header, &state.config.default_tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_header_wins_over_default() {
        assert_eq!(Tenant::resolve(Some(" acme "), "default").unwrap().id(), "acme");
        assert_eq!(Tenant::resolve(None, "default").unwrap().id(), "default");
    }

    #[test]
    fn test_blank_or_long_header_is_rejected() {
        let err = Tenant::resolve(Some("   "), "default").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let long = "t".repeat(65);
        assert!(Tenant::resolve(Some(&long), "default").is_err());
    }
}
