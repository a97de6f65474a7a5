use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

#[derive(Serialize, Clone)]
pub struct DemeritCategory {
    pub id: i64,
    pub name: String,
    pub default_points: i64,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbDemeritCategory {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub default_points: Option<i64>,
}

impl From<DbDemeritCategory> for DemeritCategory {
    fn from(category: DbDemeritCategory) -> Self {
        Self {
            id: category.id.unwrap_or_default(),
            name: category.name.unwrap_or_default(),
            default_points: category.default_points.unwrap_or(1),
        }
    }
}

/// A single ledger row, read back with the display fields the dashboards
/// need (student/teacher/category names, student grade and class) joined in.
/// The row itself is append-only; these extras are derived at read time.
#[derive(Serialize, Clone)]
pub struct DemeritRecord {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub teacher_id: i64,
    pub teacher_name: String,
    pub category_id: i64,
    pub category_name: String,
    pub points: i64,
    pub description: String,
    pub date_issued: DateTime<Utc>,
    pub grade_level: Option<i64>,
    pub class_section: Option<String>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbDemeritRecord {
    pub id: Option<i64>,
    pub student_id: Option<i64>,
    pub student_name: Option<String>,
    pub teacher_id: Option<i64>,
    pub teacher_name: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub points: Option<i64>,
    pub description: Option<String>,
    pub date_issued: Option<NaiveDateTime>,
    pub grade_level: Option<i64>,
    pub class_section: Option<String>,
}

impl From<DbDemeritRecord> for DemeritRecord {
    fn from(db: DbDemeritRecord) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            student_id: db.student_id.unwrap_or_default(),
            student_name: db.student_name.unwrap_or_default(),
            teacher_id: db.teacher_id.unwrap_or_default(),
            teacher_name: db.teacher_name.unwrap_or_default(),
            category_id: db.category_id.unwrap_or_default(),
            category_name: db.category_name.unwrap_or_default(),
            points: db.points.unwrap_or_default(),
            description: db.description.unwrap_or_default(),
            date_issued: db
                .date_issued
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
            grade_level: db.grade_level,
            class_section: db.class_section,
        }
    }
}

#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub parent_id: i64,
    pub student_id: i64,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbParentLink {
    pub parent_id: Option<i64>,
    pub student_id: Option<i64>,
}

impl From<DbParentLink> for ParentLink {
    fn from(link: DbParentLink) -> Self {
        Self {
            parent_id: link.parent_id.unwrap_or_default(),
            student_id: link.student_id.unwrap_or_default(),
        }
    }
}
