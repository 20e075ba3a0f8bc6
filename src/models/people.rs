//! People-related models: the operator, the employee roster and groups

use serde::{Deserialize, Serialize};

use super::RecordId;

/// Role of a chat participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "administrator", alias = "ADMIN")]
    Admin,
    #[default]
    #[serde(alias = "EMPLOYEE", alias = "staff")]
    Employee,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Unknown => "unknown",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Role::Admin),
            "employee" | "staff" => Ok(Role::Employee),
            other => anyhow::bail!("Unknown role '{}' (expected admin or employee)", other),
        }
    }
}

/// The signed-in user operating this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub role: Role,
}

/// Employee record as returned by the roster endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_approved: Option<bool>,
}

impl Employee {
    pub fn display_name(&self) -> String {
        if let Some(ref name) = self.name {
            if !name.trim().is_empty() {
                return name.trim().to_string();
            }
        }
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            format!("Employee {}", self.id)
        } else {
            full
        }
    }

    /// Only active, approved employees can be messaged.
    pub fn is_messageable(&self) -> bool {
        let status_ok = match self.status.as_deref() {
            None => true,
            Some(s) => matches!(s.to_ascii_lowercase().as_str(), "active" | "approved"),
        };
        status_ok && self.is_approved != Some(false)
    }
}

/// Chat group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: RecordId,
    pub name: String,
    #[serde(default, alias = "createdBy")]
    pub creator_id: Option<RecordId>,
    #[serde(default, alias = "members")]
    pub member_ids: Vec<RecordId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_employee_display_name_fallbacks() {
        let e: Employee =
            serde_json::from_value(json!({"id": 3, "firstName": "Ana", "lastName": "Ruiz"}))
                .unwrap();
        assert_eq!(e.display_name(), "Ana Ruiz");

        let e: Employee = serde_json::from_value(json!({"id": 4})).unwrap();
        assert_eq!(e.display_name(), "Employee 4");
    }

    #[test]
    fn test_employee_messageable() {
        let active: Employee =
            serde_json::from_value(json!({"id": 1, "status": "Active", "isApproved": true}))
                .unwrap();
        let pending: Employee =
            serde_json::from_value(json!({"id": 2, "status": "pending"})).unwrap();
        let unapproved: Employee =
            serde_json::from_value(json!({"id": 3, "isApproved": false})).unwrap();
        assert!(active.is_messageable());
        assert!(!pending.is_messageable());
        assert!(!unapproved.is_messageable());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("chef".parse::<Role>().is_err());
        let r: Role = serde_json::from_value(json!("manager")).unwrap();
        assert_eq!(r, Role::Unknown);
    }
}
