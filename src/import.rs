//! Bulk student onboarding from CSV. Every row goes through the same
//! validated contracts as single-record operations (`create_user`,
//! `update_student_profile`, `create_demerit`); there is no bypass path.
//! Row failures are collected and reported, not fatal.

use rand::{Rng, distr::Alphanumeric, rng};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::Role;
use crate::db::{
    create_demerit, create_user, find_category_by_name, find_user_by_username,
    get_users_by_role, update_student_profile,
};
use crate::error::AppError;

const MIGRATION_CATEGORY: &str = "Late to Class";
const MAX_POINTS_PER_RECORD: i64 = 5;

#[derive(Debug, Deserialize)]
struct StudentCsvRow {
    name: String,
    grade: i64,
    class: String,
    demerits: i64,
}

#[derive(Debug, Serialize)]
pub struct ImportOutcome {
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<String>,
    pub generated_passwords: Vec<String>,
}

fn generate_random_password(length: usize) -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Import students from CSV content with a `name,grade,class,demerits`
/// header. Carried-over demerit balances are issued against the first
/// teacher on file, split into records of at most five points each so the
/// ledger contract still holds.
#[instrument(skip_all)]
pub async fn import_students_csv(
    pool: &Pool<Sqlite>,
    csv_data: &str,
) -> Result<ImportOutcome, AppError> {
    info!("Importing students from CSV");

    let teachers = get_users_by_role(pool, Role::Teacher).await?;
    let teacher_id = teachers
        .first()
        .map(|t| t.id)
        .ok_or_else(|| AppError::UnknownReference("No teacher on file to attribute imported demerits to".to_string()))?;

    let category_id = find_category_by_name(pool, MIGRATION_CATEGORY)
        .await?
        .map(|c| c.id)
        .ok_or_else(|| {
            AppError::UnknownReference(format!(
                "Demerit category '{}' not found",
                MIGRATION_CATEGORY
            ))
        })?;

    let mut reader = csv::Reader::from_reader(csv_data.as_bytes());

    let mut success_count = 0;
    let mut failure_count = 0;
    let mut errors = Vec::new();
    let mut generated_passwords = Vec::new();

    for result in reader.deserialize() {
        let row: StudentCsvRow = match result {
            Ok(row) => row,
            Err(e) => {
                failure_count += 1;
                errors.push(format!("Error parsing CSV record: {}", e));
                continue;
            }
        };

        if let Err(e) = import_row(
            pool,
            &row,
            teacher_id,
            category_id,
            &mut generated_passwords,
        )
        .await
        {
            failure_count += 1;
            errors.push(format!("Failed to import '{}': {}", row.name, e));
            continue;
        }

        success_count += 1;
    }

    Ok(ImportOutcome {
        success_count,
        failure_count,
        errors,
        generated_passwords,
    })
}

async fn import_row(
    pool: &Pool<Sqlite>,
    row: &StudentCsvRow,
    teacher_id: i64,
    category_id: i64,
    generated_passwords: &mut Vec<String>,
) -> Result<(), AppError> {
    let name_parts: Vec<&str> = row.name.split_whitespace().collect();
    let username = row.name.replace(" ", "_").to_lowercase();
    let email = format!("{}@school.edu", username);

    let first_name = name_parts.first().copied().unwrap_or("");
    let last_name = name_parts.get(1).copied().unwrap_or("");

    let student_id = match find_user_by_username(pool, &username).await? {
        Some(existing) => existing.id,
        None => {
            let password = generate_random_password(12);
            let id = create_user(
                pool,
                &username,
                &email,
                &password,
                Role::Student,
                first_name,
                last_name,
            )
            .await?;
            generated_passwords.push(format!("{}: {}", row.name, password));
            id
        }
    };

    update_student_profile(pool, student_id, Some(row.grade), Some(&row.class)).await?;

    let mut remaining = row.demerits;
    while remaining > 0 {
        let points = remaining.min(MAX_POINTS_PER_RECORD);
        create_demerit(
            pool,
            student_id,
            teacher_id,
            category_id,
            points,
            "Data migration",
        )
        .await?;
        remaining -= points;
    }

    Ok(())
}
