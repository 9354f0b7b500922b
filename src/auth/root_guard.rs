//! The `root` account invariant, enforced in one place.

use thiserror::Error;

use super::principal::ROOT_USERNAME;

/// A change an admin is about to make to a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMutation<'a> {
    Delete,
    SetSuperuser(bool),
    SetActive(bool),
    Rename(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RootViolation {
    #[error("Cannot delete the root user")]
    Delete,

    #[error("Cannot remove superuser status from the root user")]
    Demote,

    #[error("Cannot deactivate the root user")]
    Deactivate,

    #[error("Cannot change the root username")]
    Rename,
}

/// Rejects any mutation that would break the root account, whoever asks.
pub fn ensure_root_mutation_allowed(
    target_username: &str,
    mutation: UserMutation<'_>,
) -> Result<(), RootViolation> {
    if target_username != ROOT_USERNAME {
        return Ok(());
    }

    match mutation {
        UserMutation::Delete => Err(RootViolation::Delete),
        UserMutation::SetSuperuser(false) => Err(RootViolation::Demote),
        UserMutation::SetActive(false) => Err(RootViolation::Deactivate),
        UserMutation::Rename(new_name) if new_name != ROOT_USERNAME => Err(RootViolation::Rename),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cannot_be_deleted_demoted_or_renamed() {
        assert_eq!(
            ensure_root_mutation_allowed("root", UserMutation::Delete),
            Err(RootViolation::Delete)
        );
        assert_eq!(
            ensure_root_mutation_allowed("root", UserMutation::SetSuperuser(false)),
            Err(RootViolation::Demote)
        );
        assert_eq!(
            ensure_root_mutation_allowed("root", UserMutation::Rename("admin")),
            Err(RootViolation::Rename)
        );
        assert_eq!(
            ensure_root_mutation_allowed("root", UserMutation::SetActive(false)),
            Err(RootViolation::Deactivate)
        );
    }

    #[test]
    fn test_root_no_op_changes_allowed() {
        assert!(ensure_root_mutation_allowed("root", UserMutation::SetSuperuser(true)).is_ok());
        assert!(ensure_root_mutation_allowed("root", UserMutation::SetActive(true)).is_ok());
        assert!(ensure_root_mutation_allowed("root", UserMutation::Rename("root")).is_ok());
    }

    #[test]
    fn test_other_users_unrestricted() {
        for mutation in [
            UserMutation::Delete,
            UserMutation::SetSuperuser(false),
            UserMutation::SetActive(false),
            UserMutation::Rename("someone"),
        ] {
            assert!(ensure_root_mutation_allowed("alice", mutation).is_ok());
        }
    }

    #[test]
    fn test_lookalike_names_are_not_root() {
        assert!(ensure_root_mutation_allowed("Root", UserMutation::Delete).is_ok());
        assert!(ensure_root_mutation_allowed("root2", UserMutation::Delete).is_ok());
    }
}
