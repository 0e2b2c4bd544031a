//! Ambient request context.
//!
//! Every wallet read and write happens on behalf of a tenant, inside one of the
//! tenant's environments (e.g. sandbox vs. production), and is attributed to a user.
//! The outer layers (HTTP middleware, workers) build this once per request and pass
//! it down explicitly.

use serde::{Deserialize, Serialize};

use crate::types::{EnvironmentId, TenantId, UserId};

/// Identity of the caller on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestContext {
    /// The tenant that owns every row touched by the operation.
    pub tenant_id: TenantId,
    /// The tenant environment the operation is scoped to.
    pub environment_id: EnvironmentId,
    /// The acting user, recorded in `created_by` / `updated_by`.
    pub user_id: UserId,
}

impl RequestContext {
    /// Creates a new request context.
    #[must_use]
    pub const fn new(tenant_id: TenantId, environment_id: EnvironmentId, user_id: UserId) -> Self {
        Self {
            tenant_id,
            environment_id,
            user_id,
        }
    }

    /// Returns a copy of this context acting as a different user.
    #[must_use]
    pub const fn with_user(self, user_id: UserId) -> Self {
        Self { user_id, ..self }
    }

    /// Returns true if the row identified by `tenant_id` / `environment_id` is visible.
    #[must_use]
    pub fn owns(&self, tenant_id: TenantId, environment_id: EnvironmentId) -> bool {
        self.tenant_id == tenant_id && self.environment_id == environment_id
    }
}
