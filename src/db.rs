use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use tracing::{info, instrument};

use crate::auth::{DbUser, DbUserSession, Role, RoleData, User, UserSession};
use crate::error::AppError;
use crate::models::{
    DbDemeritCategory, DbDemeritRecord, DbParentLink, DemeritCategory, DemeritRecord, ParentLink,
};

const USER_SELECT: &str =
    "SELECT id, username, email, role, first_name, last_name, created_at FROM users";

const DEMERIT_SELECT: &str = "SELECT dr.id, dr.student_id,
            su.first_name || ' ' || su.last_name AS student_name,
            dr.teacher_id,
            tu.first_name || ' ' || tu.last_name AS teacher_name,
            dr.category_id, c.name AS category_name,
            dr.points, dr.description, dr.date_issued,
            sp.grade_level, sp.class_section
     FROM demerit_records dr
     JOIN users su ON su.id = dr.student_id
     JOIN users tu ON tu.id = dr.teacher_id
     JOIN demerit_categories c ON c.id = dr.category_id
     LEFT JOIN student_profiles sp ON sp.user_id = dr.student_id";

// Most-recent-first; equal timestamps fall back to insertion order.
const DEMERIT_ORDER: &str = "ORDER BY dr.date_issued DESC, dr.id DESC";

async fn user_role(pool: &Pool<Sqlite>, user_id: i64) -> Result<Option<Role>, AppError> {
    let row = sqlx::query("SELECT role FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(Role::from_str(&row.get::<String, _>(0))?)),
        None => Ok(None),
    }
}

async fn load_role_data(
    pool: &Pool<Sqlite>,
    user_id: i64,
    role: Role,
) -> Result<RoleData, AppError> {
    match role {
        Role::Admin => Ok(RoleData::Admin),
        Role::Teacher => Ok(RoleData::Teacher),
        Role::Student => {
            let row =
                sqlx::query("SELECT grade_level, class_section FROM student_profiles WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await?;

            Ok(match row {
                Some(row) => RoleData::Student {
                    grade_level: row.get(0),
                    class_section: row.get(1),
                },
                None => RoleData::Student {
                    grade_level: None,
                    class_section: None,
                },
            })
        }
        Role::Parent => {
            let children = get_child_ids_of_parent(pool, user_id).await?;
            Ok(RoleData::Parent { children })
        }
    }
}

async fn build_user(pool: &Pool<Sqlite>, row: DbUser) -> Result<User, AppError> {
    let role = Role::from_str(row.role.as_deref().unwrap_or_default())?;
    let role_data = load_role_data(pool, row.id.unwrap_or_default(), role).await?;
    Ok(row.into_user(role_data))
}

#[instrument(skip(pool))]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(&format!("{} WHERE id = ?", USER_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(user) => build_user(pool, user).await,
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn find_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<User>, AppError> {
    info!("Looking up user by username");
    let row = sqlx::query_as::<_, DbUser>(&format!("{} WHERE username = ?", USER_SELECT))
        .bind(username)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(user) => Ok(Some(build_user(pool, user).await?)),
        None => Ok(None),
    }
}

#[instrument(skip(pool))]
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    info!("Getting all users");
    let rows = sqlx::query_as::<_, DbUser>(&format!("{} ORDER BY id", USER_SELECT))
        .fetch_all(pool)
        .await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        users.push(build_user(pool, row).await?);
    }

    Ok(users)
}

#[instrument(skip(pool))]
pub async fn get_users_by_role(pool: &Pool<Sqlite>, role: Role) -> Result<Vec<User>, AppError> {
    info!(role = %role, "Getting users by role");
    let rows = sqlx::query_as::<_, DbUser>(&format!(
        "{} WHERE role = ? ORDER BY last_name, first_name",
        USER_SELECT
    ))
    .bind(role.as_str())
    .fetch_all(pool)
    .await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        users.push(build_user(pool, row).await?);
    }

    Ok(users)
}

#[instrument(skip_all, fields(username, role))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
    first_name: &str,
    last_name: &str,
) -> Result<i64, AppError> {
    info!("Creating new user");

    let existing = sqlx::query("SELECT id FROM users WHERE username = ? OR email = ?")
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "Username '{}' or email '{}' already exists",
            username, email
        )));
    }

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query(
        "INSERT INTO users (username, email, password, role, first_name, last_name)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(username)
    .bind(email)
    .bind(hashed_password)
    .bind(role.as_str())
    .bind(first_name)
    .bind(last_name)
    .execute(pool)
    .await?;

    let user_id = res.last_insert_rowid();

    if role == Role::Student {
        sqlx::query("INSERT OR IGNORE INTO student_profiles (user_id) VALUES (?)")
            .bind(user_id)
            .execute(pool)
            .await?;
    }

    Ok(user_id)
}

#[instrument(skip_all, fields(username))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let row = sqlx::query("SELECT id, password FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let id: i64 = row.get(0);
            let hash: String = row.get(1);
            match bcrypt::verify(password, &hash) {
                Ok(true) => Ok(Some(get_user(pool, id).await?)),
                _ => Ok(None),
            }
        }
        None => Ok(None),
    }
}

#[instrument(skip(pool))]
pub async fn update_user_admin(
    pool: &Pool<Sqlite>,
    user_id: i64,
    username: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), AppError> {
    info!("Admin updating user");

    let existing = sqlx::query("SELECT id FROM users WHERE (username = ? OR email = ?) AND id != ?")
        .bind(username)
        .bind(email)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Validation(
            "Username or email already exists".to_string(),
        ));
    }

    let res = sqlx::query(
        "UPDATE users SET username = ?, email = ?, first_name = ?, last_name = ? WHERE id = ?",
    )
    .bind(username)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(user_id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            user_id
        )));
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn update_user_names(
    pool: &Pool<Sqlite>,
    user_id: i64,
    first_name: &str,
    last_name: &str,
) -> Result<(), AppError> {
    info!("Updating user names");
    sqlx::query("UPDATE users SET first_name = ?, last_name = ? WHERE id = ?")
        .bind(first_name)
        .bind(last_name)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip_all, fields(user_id))]
pub async fn update_user_password(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_password: &str,
) -> Result<(), AppError> {
    info!("Updating user password");
    let hashed_password = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hashed_password)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Change a user's role, cascading the role extension data: leaving the
/// student role drops the profile row, entering it creates an empty one, and
/// leaving the parent role drops that parent's links. Historical demerit
/// rows are never touched.
#[instrument(skip(pool))]
pub async fn update_user_role(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_role: Role,
) -> Result<User, AppError> {
    info!(new_role = %new_role, "Updating user role");

    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT role FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

    let old_role = match row {
        Some(row) => Role::from_str(&row.get::<String, _>(0))?,
        None => {
            return Err(AppError::NotFound(format!(
                "User with id {} not found in database",
                user_id
            )));
        }
    };

    if old_role == new_role {
        tx.commit().await?;
        return get_user(pool, user_id).await;
    }

    sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(new_role.as_str())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    match old_role {
        Role::Student => {
            sqlx::query("DELETE FROM student_profiles WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        Role::Parent => {
            sqlx::query("DELETE FROM parent_links WHERE parent_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        Role::Admin | Role::Teacher => {}
    }

    if new_role == Role::Student {
        sqlx::query("INSERT OR IGNORE INTO student_profiles (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    get_user(pool, user_id).await
}

#[instrument(skip(pool))]
pub async fn update_student_profile(
    pool: &Pool<Sqlite>,
    user_id: i64,
    grade_level: Option<i64>,
    class_section: Option<&str>,
) -> Result<(), AppError> {
    info!("Updating student profile");

    match user_role(pool, user_id).await? {
        Some(Role::Student) => {}
        Some(role) => {
            return Err(AppError::InvalidRole(format!(
                "User {} has role {}, expected student",
                user_id, role
            )));
        }
        None => {
            return Err(AppError::NotFound(format!(
                "User with id {} not found in database",
                user_id
            )));
        }
    }

    sqlx::query(
        "INSERT INTO student_profiles (user_id, grade_level, class_section)
         VALUES (?, ?, ?)
         ON CONFLICT (user_id) DO UPDATE
         SET grade_level = excluded.grade_level, class_section = excluded.class_section",
    )
    .bind(user_id)
    .bind(grade_level)
    .bind(class_section)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn add_parent_link(
    pool: &Pool<Sqlite>,
    parent_id: i64,
    student_id: i64,
) -> Result<(), AppError> {
    info!("Linking parent to student");

    match user_role(pool, parent_id).await? {
        Some(Role::Parent) => {}
        Some(role) => {
            return Err(AppError::InvalidRole(format!(
                "User {} has role {}, expected parent",
                parent_id, role
            )));
        }
        None => {
            return Err(AppError::UnknownReference(format!(
                "Parent user {} does not exist",
                parent_id
            )));
        }
    }

    match user_role(pool, student_id).await? {
        Some(Role::Student) => {}
        Some(role) => {
            return Err(AppError::InvalidRole(format!(
                "User {} has role {}, expected student",
                student_id, role
            )));
        }
        None => {
            return Err(AppError::UnknownReference(format!(
                "Student user {} does not exist",
                student_id
            )));
        }
    }

    // Re-adding an existing pair is a no-op; the UNIQUE constraint absorbs
    // concurrent duplicates.
    sqlx::query("INSERT OR IGNORE INTO parent_links (parent_id, student_id) VALUES (?, ?)")
        .bind(parent_id)
        .bind(student_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Ensure every pair in `student_ids` exists. Links omitted from the set are
/// left in place; removal is an explicit, separate action.
#[instrument(skip(pool))]
pub async fn replace_parent_links(
    pool: &Pool<Sqlite>,
    parent_id: i64,
    student_ids: &[i64],
) -> Result<(), AppError> {
    info!("Replacing parent links");
    for student_id in student_ids {
        add_parent_link(pool, parent_id, *student_id).await?;
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_child_ids_of_parent(
    pool: &Pool<Sqlite>,
    parent_id: i64,
) -> Result<Vec<i64>, AppError> {
    let rows = sqlx::query("SELECT student_id FROM parent_links WHERE parent_id = ? ORDER BY id")
        .bind(parent_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|row| row.get(0)).collect())
}

#[instrument(skip(pool))]
pub async fn get_children_of_parent(
    pool: &Pool<Sqlite>,
    parent_id: i64,
) -> Result<Vec<User>, AppError> {
    info!("Getting children of parent");
    let child_ids = get_child_ids_of_parent(pool, parent_id).await?;

    let mut children = Vec::with_capacity(child_ids.len());
    for child_id in child_ids {
        children.push(get_user(pool, child_id).await?);
    }

    Ok(children)
}

#[instrument(skip(pool))]
pub async fn get_all_parent_links(pool: &Pool<Sqlite>) -> Result<Vec<ParentLink>, AppError> {
    info!("Getting all parent links");
    let rows = sqlx::query_as::<_, DbParentLink>(
        "SELECT parent_id, student_id FROM parent_links ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ParentLink::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_categories(pool: &Pool<Sqlite>) -> Result<Vec<DemeritCategory>, AppError> {
    info!("Getting demerit categories");
    let rows = sqlx::query_as::<_, DbDemeritCategory>(
        "SELECT id, name, default_points FROM demerit_categories ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DemeritCategory::from).collect())
}

#[instrument(skip(pool))]
pub async fn find_category_by_name(
    pool: &Pool<Sqlite>,
    name: &str,
) -> Result<Option<DemeritCategory>, AppError> {
    let row = sqlx::query_as::<_, DbDemeritCategory>(
        "SELECT id, name, default_points FROM demerit_categories WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(DemeritCategory::from))
}

#[instrument(skip(pool))]
pub async fn create_category(
    pool: &Pool<Sqlite>,
    name: &str,
    default_points: i64,
) -> Result<i64, AppError> {
    info!("Creating demerit category");

    if default_points < 1 {
        return Err(AppError::OutOfRange(format!(
            "Category default points must be at least 1, got {}",
            default_points
        )));
    }

    let res = sqlx::query("INSERT INTO demerit_categories (name, default_points) VALUES (?, ?)")
        .bind(name)
        .bind(default_points)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

/// Append a demerit to the ledger. Points outside [1,5] are rejected, never
/// clamped; all three references must exist with the right roles at creation
/// time. Nothing else is updated — totals are derived at read time.
#[instrument(skip(pool, description))]
pub async fn create_demerit(
    pool: &Pool<Sqlite>,
    student_id: i64,
    teacher_id: i64,
    category_id: i64,
    points: i64,
    description: &str,
) -> Result<DemeritRecord, AppError> {
    info!("Creating demerit record");

    if !(1..=5).contains(&points) {
        return Err(AppError::OutOfRange(format!(
            "Demerit points must be between 1 and 5, got {}",
            points
        )));
    }

    match user_role(pool, student_id).await? {
        Some(Role::Student) => {}
        Some(role) => {
            return Err(AppError::UnknownReference(format!(
                "User {} has role {}, expected student",
                student_id, role
            )));
        }
        None => {
            return Err(AppError::UnknownReference(format!(
                "Student user {} does not exist",
                student_id
            )));
        }
    }

    match user_role(pool, teacher_id).await? {
        Some(Role::Teacher) => {}
        Some(role) => {
            return Err(AppError::UnknownReference(format!(
                "User {} has role {}, expected teacher",
                teacher_id, role
            )));
        }
        None => {
            return Err(AppError::UnknownReference(format!(
                "Teacher user {} does not exist",
                teacher_id
            )));
        }
    }

    let category = sqlx::query("SELECT id FROM demerit_categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(pool)
        .await?;

    if category.is_none() {
        return Err(AppError::UnknownReference(format!(
            "Demerit category {} does not exist",
            category_id
        )));
    }

    let now = Utc::now().naive_utc();
    let res = sqlx::query(
        "INSERT INTO demerit_records (student_id, teacher_id, category_id, points, description, date_issued)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(student_id)
    .bind(teacher_id)
    .bind(category_id)
    .bind(points)
    .bind(description)
    .bind(now)
    .execute(pool)
    .await?;

    get_demerit(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn get_demerit(pool: &Pool<Sqlite>, id: i64) -> Result<DemeritRecord, AppError> {
    let row = sqlx::query_as::<_, DbDemeritRecord>(&format!("{} WHERE dr.id = ?", DEMERIT_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(record) => Ok(DemeritRecord::from(record)),
        None => Err(AppError::NotFound(format!(
            "Demerit record with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn get_all_demerits(pool: &Pool<Sqlite>) -> Result<Vec<DemeritRecord>, AppError> {
    info!("Getting all demerit records");
    let rows = sqlx::query_as::<_, DbDemeritRecord>(&format!(
        "{} {}",
        DEMERIT_SELECT, DEMERIT_ORDER
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DemeritRecord::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_demerits_for_student(
    pool: &Pool<Sqlite>,
    student_id: i64,
) -> Result<Vec<DemeritRecord>, AppError> {
    info!("Getting demerit records for student");
    let rows = sqlx::query_as::<_, DbDemeritRecord>(&format!(
        "{} WHERE dr.student_id = ? {}",
        DEMERIT_SELECT, DEMERIT_ORDER
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DemeritRecord::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_demerits_for_students(
    pool: &Pool<Sqlite>,
    student_ids: &[i64],
) -> Result<Vec<DemeritRecord>, AppError> {
    info!("Getting demerit records for student set");

    if student_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; student_ids.len()].join(", ");
    let query = format!(
        "{} WHERE dr.student_id IN ({}) {}",
        DEMERIT_SELECT, placeholders, DEMERIT_ORDER
    );

    let mut q = sqlx::query_as::<_, DbDemeritRecord>(&query);
    for student_id in student_ids {
        q = q.bind(*student_id);
    }

    let rows = q.fetch_all(pool).await?;

    Ok(rows.into_iter().map(DemeritRecord::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_demerits_issued_by(
    pool: &Pool<Sqlite>,
    teacher_id: i64,
) -> Result<Vec<DemeritRecord>, AppError> {
    info!("Getting demerit records issued by teacher");
    let rows = sqlx::query_as::<_, DbDemeritRecord>(&format!(
        "{} WHERE dr.teacher_id = ? {}",
        DEMERIT_SELECT, DEMERIT_ORDER
    ))
    .bind(teacher_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DemeritRecord::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_total_points_for_student(
    pool: &Pool<Sqlite>,
    student_id: i64,
) -> Result<i64, AppError> {
    let row = sqlx::query(
        "SELECT COALESCE(SUM(points), 0) FROM demerit_records WHERE student_id = ?",
    )
    .bind(student_id)
    .fetch_one(pool)
    .await?;

    Ok(row.get(0))
}

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<UserSession, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// First-startup seed: a default admin account and the stock demerit
/// categories. Both are no-ops on later startups.
#[instrument(skip(pool))]
pub async fn ensure_seed_data(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    let admin_exists = sqlx::query("SELECT id FROM users WHERE role = 'admin' LIMIT 1")
        .fetch_optional(pool)
        .await?
        .is_some();

    if !admin_exists {
        create_user(
            pool,
            "admin",
            "admin@school.edu",
            "admin123",
            Role::Admin,
            "System",
            "Administrator",
        )
        .await?;
        info!("Seeded default admin account");
    }

    let categories: [(&str, i64); 5] = [
        ("Late to Class", 1),
        ("Incomplete Homework", 1),
        ("Dress Code Violation", 2),
        ("Disruptive Behavior", 3),
        ("Abuse of E-Gadgets", 4),
    ];

    for (name, default_points) in categories {
        sqlx::query(
            "INSERT OR IGNORE INTO demerit_categories (name, default_points) VALUES (?, ?)",
        )
        .bind(name)
        .bind(default_points)
        .execute(pool)
        .await?;
    }

    Ok(())
}
