use serde::{Deserialize, Serialize};

use atrium_core::DomainError;

/// Coarse, non-configurable user tier consumed from the user-management
/// feature.
///
/// Exactly one user holds `Owner` system-wide; the role source enforces that.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaticRole {
    User,
    Admin,
    Owner,
}

impl StaticRole {
    pub const ALL: [StaticRole; 3] = [StaticRole::User, StaticRole::Admin, StaticRole::Owner];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaticRole::User => "USER",
            StaticRole::Admin => "ADMIN",
            StaticRole::Owner => "OWNER",
        }
    }

    /// Roles allowed to manage groups and the registry.
    pub fn can_manage(&self) -> bool {
        matches!(self, StaticRole::Admin | StaticRole::Owner)
    }
}

impl core::fmt::Display for StaticRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for StaticRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(StaticRole::User),
            "ADMIN" => Ok(StaticRole::Admin),
            "OWNER" => Ok(StaticRole::Owner),
            other => Err(DomainError::validation(format!(
                "unknown role '{other}' (expected USER, ADMIN or OWNER)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("admin".parse::<StaticRole>().unwrap(), StaticRole::Admin);
        assert_eq!(" Owner ".parse::<StaticRole>().unwrap(), StaticRole::Owner);
        assert!("root".parse::<StaticRole>().is_err());
    }

    #[test]
    fn only_admin_and_owner_manage() {
        assert!(!StaticRole::User.can_manage());
        assert!(StaticRole::Admin.can_manage());
        assert!(StaticRole::Owner.can_manage());
    }

    #[test]
    fn serializes_in_upper_case() {
        let json = serde_json::to_string(&StaticRole::Admin).unwrap();
        assert_eq!(json, "\"ADMIN\"");
    }
}
