//! crates/membership_core/src/session.rs
//!
//! The per-request authorization context. It is resolved once at the request
//! boundary and handed to every core operation; nothing mutates it afterwards.

use tracing::warn;
use uuid::Uuid;

use crate::domain::Role;
use crate::error::{ServiceError, ServiceResult};
use crate::ports::DatabaseService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            is_admin: false,
        }
    }

    /// Looks up the caller's role. A failed lookup yields a non-admin context
    /// instead of an error.
    pub async fn resolve(db: &dyn DatabaseService, user_id: Uuid) -> Self {
        let is_admin = match db.has_role(user_id, Role::Admin).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                warn!(%user_id, error = %e, "role check failed, treating user as non-admin");
                false
            }
        };
        Self {
            user_id: Some(user_id),
            is_admin,
        }
    }

    pub fn require_user(&self) -> ServiceResult<Uuid> {
        self.user_id.ok_or(ServiceError::AuthenticationRequired)
    }

    pub fn require_admin(&self) -> ServiceResult<Uuid> {
        let user_id = self.require_user()?;
        if self.is_admin {
            Ok(user_id)
        } else {
            Err(ServiceError::AuthorizationDenied(
                "admin role required".to_string(),
            ))
        }
    }

    /// Admins may act on anything; everyone else only on what they own.
    pub fn require_owner_or_admin(&self, owner: Uuid) -> ServiceResult<Uuid> {
        let user_id = self.require_user()?;
        if self.is_admin || user_id == owner {
            Ok(user_id)
        } else {
            Err(ServiceError::AuthorizationDenied(
                "only the author or an admin may do this".to_string(),
            ))
        }
    }

    /// Approved items are visible to everyone; pending ones only to their
    /// author and to admins.
    pub fn can_see(&self, approved: bool, author: Uuid) -> bool {
        approved || self.is_admin || self.user_id == Some(author)
    }
}
