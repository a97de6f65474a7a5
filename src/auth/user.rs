use chrono::{DateTime, NaiveDateTime, Utc};
use rocket::http::Status;
use serde::Serialize;

use super::{Permission, Role};

/// Role-specific data carried alongside the base user record. Consumption
/// sites match exhaustively; there is no optional-field probing.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub enum RoleData {
    Admin,
    Teacher,
    Student {
        grade_level: Option<i64>,
        class_section: Option<String>,
    },
    Parent {
        /// Linked student ids, in link-insertion order.
        children: Vec<i64>,
    },
}

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub role: RoleData,
}

/// Raw `users` row; role extension data is loaded separately.
#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl DbUser {
    pub fn into_user(self, role_data: RoleData) -> User {
        User {
            id: self.id.unwrap_or_default(),
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            created_at: self
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
            role: role_data,
        }
    }
}

impl User {
    pub fn role(&self) -> Role {
        match &self.role {
            RoleData::Admin => Role::Admin,
            RoleData::Teacher => Role::Teacher,
            RoleData::Student { .. } => Role::Student,
            RoleData::Parent { .. } => Role::Parent,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role().has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.role().has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role().as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(Status::Forbidden)
        }
    }

    pub fn require_all_permissions(&self, permissions: &[Permission]) -> Result<(), Status> {
        if permissions.iter().all(|p| self.role().has_permission(*p)) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role().as_str(),
                permissions = ?permissions,
                "Permission denied (require all)"
            );
            Err(Status::Forbidden)
        }
    }
}
