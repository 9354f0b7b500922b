//! Per-route privilege checks layered on a resolved principal.
//!
//! `Unauthenticated` means "log in again"; `Forbidden` means new credentials
//! will not help. Callers keep the two apart.

use thiserror::Error;

use super::principal::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not enough permissions")]
    Forbidden,
}

pub fn require_authenticated(principal: Option<&Principal>) -> Result<&Principal, AccessError> {
    match principal {
        Some(p) if p.is_active => Ok(p),
        _ => Err(AccessError::Unauthenticated),
    }
}

pub const fn require_self_or_superuser(
    principal: &Principal,
    owner_id: i32,
) -> Result<(), AccessError> {
    if principal.id == owner_id || principal.is_superuser {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}

pub const fn require_superuser(principal: &Principal) -> Result<(), AccessError> {
    if principal.is_superuser {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}
