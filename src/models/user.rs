//! Caller identity as resolved by the upstream identity gateway

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Librarian,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Librarian => "librarian",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "librarian" => Ok(Role::Librarian),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// The already-authenticated caller. The core trusts this value as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: i32,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_librarian(&self) -> bool {
        self.role == Role::Librarian
    }

    // Authorization checks
    pub fn require_librarian(&self) -> Result<(), AppError> {
        if self.is_librarian() {
            Ok(())
        } else {
            Err(AppError::Authorization("Librarian role required".to_string()))
        }
    }

    /// Librarians act on anyone's behalf; members only on their own.
    pub fn require_self_or_librarian(&self, borrower_id: i32) -> Result<(), AppError> {
        if self.is_librarian() || self.id == borrower_id {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Members may only act on their own loans".to_string(),
            ))
        }
    }

    /// Borrower a borrow request is recorded for
    pub fn borrower_for(&self, requested: Option<i32>) -> Result<i32, AppError> {
        match requested {
            None => Ok(self.id),
            Some(id) => {
                self.require_self_or_librarian(id)?;
                Ok(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!("librarian".parse::<Role>(), Ok(Role::Librarian));
        assert_eq!(" Member ".parse::<Role>(), Ok(Role::Member));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_member_policy() {
        let member = CurrentUser { id: 4, role: Role::Member };
        assert!(member.require_librarian().is_err());
        assert!(member.require_self_or_librarian(4).is_ok());
        assert!(member.require_self_or_librarian(5).is_err());
        assert_eq!(member.borrower_for(None).unwrap(), 4);
        assert!(member.borrower_for(Some(9)).is_err());
    }

    #[test]
    fn test_librarian_policy() {
        let librarian = CurrentUser { id: 1, role: Role::Librarian };
        assert!(librarian.require_librarian().is_ok());
        assert!(librarian.require_self_or_librarian(42).is_ok());
        assert_eq!(librarian.borrower_for(Some(42)).unwrap(), 42);
    }
}
