use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnDemerits,
    ViewChildDemerits,
    EditOwnProfile,

    ViewAllDemerits,
    IssueDemerits,
    ViewStudentList,
    ViewAnalytics,

    ManageUsers,
    ManageLinks,
    ImportStudents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Parent,
}

static STUDENT_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewOwnDemerits);
    permissions.insert(Permission::EditOwnProfile);

    permissions
});

static PARENT_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewChildDemerits);
    permissions.insert(Permission::EditOwnProfile);

    permissions
});

static TEACHER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewAllDemerits);
    permissions.insert(Permission::IssueDemerits);
    permissions.insert(Permission::ViewStudentList);
    permissions.insert(Permission::ViewAnalytics);
    permissions.insert(Permission::EditOwnProfile);

    permissions
});

// Admins manage accounts and relationships but do not issue demerits
// themselves; issuing stays with teachers.
static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewAllDemerits);
    permissions.insert(Permission::ViewStudentList);
    permissions.insert(Permission::ViewAnalytics);
    permissions.insert(Permission::EditOwnProfile);

    permissions.insert(Permission::ManageUsers);
    permissions.insert(Permission::ManageLinks);
    permissions.insert(Permission::ImportStudents);

    permissions
});

impl Role {
    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Admin => &ADMIN_PERMISSIONS,
            Role::Teacher => &TEACHER_PERMISSIONS,
            Role::Student => &STUDENT_PERMISSIONS,
            Role::Parent => &PARENT_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            _ => Err(AppError::InvalidRole(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which ledger rows a requester may see. Resolved from the role table and,
/// for parents, the requester's linked children. Every read path goes through
/// this; no handler filters the ledger on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemeritScope {
    All,
    Student(i64),
    Students(Vec<i64>),
}

impl DemeritScope {
    pub fn for_user(user: &crate::auth::User) -> DemeritScope {
        use crate::auth::RoleData;

        match &user.role {
            RoleData::Admin | RoleData::Teacher => DemeritScope::All,
            RoleData::Student { .. } => DemeritScope::Student(user.id),
            RoleData::Parent { children } => DemeritScope::Students(children.clone()),
        }
    }
}
