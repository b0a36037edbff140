use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use salesdesk_core::{require_non_blank, AdminId, DomainError, DomainResult, Entity, Region};

/// Admin role. Salespeople only see their own customers and transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    MasterAdmin,
    Manager,
    Salesperson,
}

impl Role {
    pub fn code(self) -> &'static str {
        match self {
            Role::MasterAdmin => "MASTER_ADMIN",
            Role::Manager => "MANAGER",
            Role::Salesperson => "SALESPERSON",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::MasterAdmin => "Master Admin",
            Role::Manager => "Manager",
            Role::Salesperson => "Salesperson",
        }
    }

    /// Everyone except salespeople has back-office rights.
    pub fn is_admin(self) -> bool {
        self != Role::Salesperson
    }

    pub fn is_master_admin(self) -> bool {
        self == Role::MasterAdmin
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Accepts stored codes (`MASTER_ADMIN`) and labels (`Master Admin`).
impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "masteradmin" => Ok(Role::MasterAdmin),
            "manager" => Ok(Role::Manager),
            "salesperson" => Ok(Role::Salesperson),
            _ => Err(DomainError::validation(format!("invalid role: {s:?}"))),
        }
    }
}

/// Back-office user: salesperson, manager or master admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    /// Internal salesperson code.
    pub code: String,
    /// Every transaction this admin creates is attributed to this region.
    pub region: Region,
}

impl Entity for Admin {
    type Id = AdminId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Admin {
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.name, &self.email, &self.code]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Owner filter for records this admin may see: salespeople are limited
    /// to their own, everyone else sees all.
    pub fn visible_owner(&self) -> Option<AdminId> {
        if self.role.is_admin() {
            None
        } else {
            Some(self.id)
        }
    }

    pub fn apply_patch(&self, patch: AdminPatch) -> DomainResult<Admin> {
        let mut updated = self.clone();
        if let Some(name) = patch.name {
            require_non_blank("name", &name)?;
            updated.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            updated.email = normalize_email(&email)?;
        }
        if let Some(phone) = patch.phone {
            require_non_blank("phone", &phone)?;
            updated.phone = phone.trim().to_string();
        }
        if let Some(role) = patch.role {
            updated.role = role.parse()?;
        }
        if let Some(code) = patch.code {
            require_non_blank("code", &code)?;
            updated.code = code.trim().to_string();
        }
        if let Some(region) = patch.region {
            updated.region = region.parse()?;
        }
        Ok(updated)
    }
}

/// Input for registering an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub code: String,
    pub region: String,
}

/// Validated admin fields, ready to be assigned an id by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub code: String,
    pub region: Region,
}

impl AdminDraft {
    pub fn into_admin(self, id: AdminId, created_at: DateTime<Utc>) -> Admin {
        Admin {
            id,
            created_at,
            name: self.name,
            email: self.email,
            phone: self.phone,
            role: self.role,
            code: self.code,
            region: self.region,
        }
    }
}

impl NewAdmin {
    pub fn validate(self) -> DomainResult<AdminDraft> {
        require_non_blank("name", &self.name)?;
        let email = normalize_email(&self.email)?;
        require_non_blank("phone", &self.phone)?;
        let role: Role = self.role.parse()?;
        require_non_blank("code", &self.code)?;
        let region: Region = self.region.parse()?;

        Ok(AdminDraft {
            name: self.name.trim().to_string(),
            email,
            phone: self.phone.trim().to_string(),
            role,
            code: self.code.trim().to_string(),
            region,
        })
    }
}

/// Partial update for an admin; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub code: Option<String>,
    pub region: Option<String>,
}

/// Minimal shape check: one `@` with text on both sides and a dotted domain.
pub(crate) fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("invalid email"));
    }
    Ok(email.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_salesperson() -> NewAdmin {
        NewAdmin {
            name: "Aminah Yusof".to_string(),
            email: "Aminah@Example.com".to_string(),
            phone: "0123456789".to_string(),
            role: "SALESPERSON".to_string(),
            code: "SP-07".to_string(),
            region: "EAST_COAST".to_string(),
        }
    }

    #[test]
    fn validate_parses_role_and_region() {
        let draft = new_salesperson().validate().unwrap();
        assert_eq!(draft.role, Role::Salesperson);
        assert_eq!(draft.region, Region::EastCoast);
        assert_eq!(draft.email, "aminah@example.com");
    }

    #[test]
    fn unknown_region_fails_closed() {
        let mut input = new_salesperson();
        input.region = "WEST".to_string();
        assert!(matches!(input.validate(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn malformed_email_is_rejected() {
        for email in ["", "no-at-sign", "@example.com", "a@b", "a@@b.com", "a@.com"] {
            let mut input = new_salesperson();
            input.email = email.to_string();
            assert!(input.validate().is_err(), "accepted {email:?}");
        }
    }

    #[test]
    fn role_accepts_labels() {
        assert_eq!("Master Admin".parse::<Role>().unwrap(), Role::MasterAdmin);
        assert_eq!("master_admin".parse::<Role>().unwrap(), Role::MasterAdmin);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn admin_rights() {
        assert!(Role::Manager.is_admin());
        assert!(!Role::Salesperson.is_admin());
        assert!(Role::MasterAdmin.is_master_admin());
        assert!(!Role::Manager.is_master_admin());
    }

    #[test]
    fn salespeople_only_see_their_own_records() {
        let mut admin = new_salesperson()
            .validate()
            .unwrap()
            .into_admin(AdminId::new(9), Utc::now());
        assert_eq!(admin.visible_owner(), Some(AdminId::new(9)));
        admin.role = Role::Manager;
        assert_eq!(admin.visible_owner(), None);
    }

    #[test]
    fn patch_changes_only_given_fields() {
        let admin = new_salesperson()
            .validate()
            .unwrap()
            .into_admin(AdminId::new(3), Utc::now());
        let patched = admin
            .apply_patch(AdminPatch {
                region: Some("NORTH".to_string()),
                ..AdminPatch::default()
            })
            .unwrap();
        assert_eq!(patched.region, Region::North);
        assert_eq!(patched.name, admin.name);
        assert_eq!(patched.id, admin.id);
    }
}
