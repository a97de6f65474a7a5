use rocket::State;
use rocket::http::Status;
use rocket::response::Redirect;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::aggregate::{
    CategoryCount, GradeCount, StudentSummary, TrendPoint, distribution_by_category,
    distribution_by_grade, summarize_by_student, trend_over_time,
};
use crate::auth::{DemeritScope, Permission, Role, RoleData, User, UserSession};
use crate::db::{
    add_parent_link, authenticate_user, create_demerit,
    create_user, create_user_session, get_all_demerits, get_all_parent_links, get_all_users,
    get_categories, get_children_of_parent, get_demerits_for_student, get_demerits_for_students,
    get_demerits_issued_by, get_total_points_for_student, get_user, get_users_by_role,
    invalidate_session, replace_parent_links, update_student_profile, update_user_admin,
    update_user_names, update_user_password, update_user_role,
};
use crate::import::{ImportOutcome, import_students_csv};
use crate::models::{DemeritCategory, DemeritRecord, ParentLink};
use crate::validation::AppErrorExt;
use crate::validation::JsonValidateExt;
use crate::validation::PermissionCheckExt;
use crate::validation::ValidationResponse;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserData>,
    pub error: Option<String>,
    pub redirect_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub created_at: String,
    pub grade_level: Option<i64>,
    pub class_section: Option<String>,
    pub children: Vec<i64>,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        let role = user.role().to_string();
        let User {
            id,
            username,
            email,
            first_name,
            last_name,
            created_at,
            role: role_data,
        } = user;

        let (grade_level, class_section, children) = match role_data {
            RoleData::Admin | RoleData::Teacher => (None, None, Vec::new()),
            RoleData::Student {
                grade_level,
                class_section,
            } => (grade_level, class_section, Vec::new()),
            RoleData::Parent { children } => (None, None, children),
        };

        Self {
            id,
            username,
            email,
            first_name,
            last_name,
            role,
            created_at: created_at.to_rfc3339(),
            grade_level,
            class_section,
            children,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct DemeritResponse {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub teacher_id: i64,
    pub teacher_name: String,
    pub category_id: i64,
    pub category_name: String,
    pub points: i64,
    pub description: String,
    pub date_issued: String,
}

impl From<DemeritRecord> for DemeritResponse {
    fn from(record: DemeritRecord) -> Self {
        Self {
            id: record.id,
            student_id: record.student_id,
            student_name: record.student_name,
            teacher_id: record.teacher_id,
            teacher_name: record.teacher_name,
            category_id: record.category_id,
            category_name: record.category_name,
            points: record.points,
            description: record.description,
            date_issued: record.date_issued.to_rfc3339(),
        }
    }
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<LoginResponse>, Custom<Json<ValidationResponse>>> {
    use chrono::Utc;
    use rocket::http::{Cookie, SameSite};

    let validated = login.validate_custom()?;

    match authenticate_user(db, &validated.username, &validated.password)
        .await
        .validate_custom()?
    {
        Some(user) => {
            let token = UserSession::generate_token();
            let expires_at = Utc::now() + chrono::Duration::hours(1);

            create_user_session(db, user.id, &token, expires_at.naive_utc())
                .await
                .validate_custom()?;

            let cookie = Cookie::build(("session_token", token))
                .same_site(SameSite::Lax)
                .http_only(true)
                .max_age(rocket::time::Duration::hours(1));
            cookies.add_private(cookie);

            cookies.add_private(
                Cookie::build(("user_id", user.id.to_string()))
                    .same_site(SameSite::Lax)
                    .http_only(true)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            cookies.add_private(
                Cookie::build(("user_role", user.role().to_string()))
                    .same_site(SameSite::Lax)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            let redirect_url = match user.role() {
                Role::Student => "/ui/student".to_string(),
                Role::Parent => "/ui/parent".to_string(),
                Role::Teacher => "/ui/teacher".to_string(),
                Role::Admin => "/ui/admin".to_string(),
            };

            Ok(Json(LoginResponse {
                success: true,
                user: Some(UserData::from(user)),
                error: None,
                redirect_url: Some(redirect_url),
            }))
        }
        None => Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some("Invalid username or password".to_string()),
            redirect_url: None,
        })),
    }
}

#[post("/logout")]
pub async fn api_logout(
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Redirect {
    let token = cookies
        .get_private("session_token")
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        let _ = invalidate_session(db, &token).await;
    }

    cookies.remove_private(rocket::http::Cookie::build("session_token"));
    cookies.remove_private(rocket::http::Cookie::build("user_id"));
    cookies.remove_private(rocket::http::Cookie::build("user_role"));

    Redirect::to("/ui/")
}

#[get("/me")]
pub async fn api_me(user: User) -> Json<UserData> {
    Json(UserData::from(user))
}

#[get("/me", rank = 2)]
pub async fn api_me_unauthorized() -> Status {
    Status::Unauthorized
}

#[derive(Deserialize, Validate)]
pub struct CreateDemeritRequest {
    student_id: i64,
    category_id: i64,
    points: i64,
    #[validate(length(max = 500, message = "Description too long"))]
    description: String,
}

#[post("/demerits", data = "<request>")]
pub async fn api_create_demerit(
    request: Json<CreateDemeritRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DemeritResponse>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::IssueDemerits)
        .validate_custom()?;

    let validated = request.validate_custom()?;

    let record = create_demerit(
        db,
        validated.student_id,
        user.id,
        validated.category_id,
        validated.points,
        &validated.description,
    )
    .await
    .validate_custom()?;

    Ok(Json(DemeritResponse::from(record)))
}

#[get("/demerits")]
pub async fn api_get_demerits(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<DemeritResponse>>, Status> {
    let records = match DemeritScope::for_user(&user) {
        DemeritScope::All => get_all_demerits(db).await?,
        DemeritScope::Student(student_id) => get_demerits_for_student(db, student_id).await?,
        DemeritScope::Students(student_ids) => {
            get_demerits_for_students(db, &student_ids).await?
        }
    };

    Ok(Json(records.into_iter().map(DemeritResponse::from).collect()))
}

#[get("/demerits/issued")]
pub async fn api_get_issued_demerits(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<DemeritResponse>>, Status> {
    user.require_permission(Permission::IssueDemerits)?;

    let records = get_demerits_issued_by(db, user.id).await?;

    Ok(Json(records.into_iter().map(DemeritResponse::from).collect()))
}

#[get("/students")]
pub async fn api_get_students(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, Status> {
    user.require_permission(Permission::ViewStudentList)?;

    let students = get_users_by_role(db, Role::Student).await?;

    Ok(Json(students.into_iter().map(UserData::from).collect()))
}

#[get("/students/summary")]
pub async fn api_get_student_summaries(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<StudentSummary>>, Status> {
    user.require_permission(Permission::ViewAllDemerits)?;

    let records = get_all_demerits(db).await?;
    let mut summaries = summarize_by_student(&records);

    // Students without any demerits still show up, with a zero total.
    let students = get_users_by_role(db, Role::Student).await?;
    for student in &students {
        if !summaries.iter().any(|s| s.student_id == student.id) {
            let (grade_level, class_section) = match &student.role {
                RoleData::Student {
                    grade_level,
                    class_section,
                } => (*grade_level, class_section.clone()),
                _ => (None, None),
            };
            summaries.push(StudentSummary::empty(
                student.id,
                student.full_name(),
                grade_level,
                class_section,
            ));
        }
    }

    Ok(Json(summaries))
}

#[get("/parent/children")]
pub async fn api_get_children_summary(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<StudentSummary>>, Status> {
    user.require_permission(Permission::ViewChildDemerits)?;

    let children = get_children_of_parent(db, user.id).await?;
    let child_ids: Vec<i64> = children.iter().map(|c| c.id).collect();

    let records = get_demerits_for_students(db, &child_ids).await?;
    let mut summaries = summarize_by_student(&records);

    for child in &children {
        if !summaries.iter().any(|s| s.student_id == child.id) {
            let (grade_level, class_section) = match &child.role {
                RoleData::Student {
                    grade_level,
                    class_section,
                } => (*grade_level, class_section.clone()),
                _ => (None, None),
            };
            summaries.push(StudentSummary::empty(
                child.id,
                child.full_name(),
                grade_level,
                class_section,
            ));
        }
    }

    Ok(Json(summaries))
}

#[get("/categories")]
pub async fn api_get_categories(
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<DemeritCategory>>, Status> {
    let categories = get_categories(db).await?;
    Ok(Json(categories))
}

#[derive(Serialize)]
pub struct DistributionResponse {
    pub categories: Vec<CategoryCount>,
    pub grades: Vec<GradeCount>,
}

#[get("/analytics/distribution")]
pub async fn api_get_distribution(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DistributionResponse>, Status> {
    user.require_permission(Permission::ViewAnalytics)?;

    let records = get_all_demerits(db).await?;

    Ok(Json(DistributionResponse {
        categories: distribution_by_category(&records),
        grades: distribution_by_grade(&records),
    }))
}

#[get("/analytics/trend")]
pub async fn api_get_trend(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<TrendPoint>>, Status> {
    user.require_permission(Permission::ViewAnalytics)?;

    let records = get_all_demerits(db).await?;

    Ok(Json(trend_over_time(&records)))
}

#[derive(Serialize)]
pub struct StudentRef {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize)]
pub struct AdminUserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub created_at: String,
    pub grade_level: Option<i64>,
    pub class_section: Option<String>,
    pub total_demerits: i64,
    pub children: Vec<StudentRef>,
}

#[get("/admin/users")]
pub async fn api_get_all_users(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<AdminUserResponse>>, Status> {
    user.require_permission(Permission::ManageUsers)?;

    let users = get_all_users(db).await?;

    let mut responses = Vec::with_capacity(users.len());
    for u in users {
        let (grade_level, class_section, total_demerits, children) = match &u.role {
            RoleData::Student {
                grade_level,
                class_section,
            } => (
                *grade_level,
                class_section.clone(),
                get_total_points_for_student(db, u.id).await?,
                Vec::new(),
            ),
            RoleData::Parent { children } => {
                let mut refs = Vec::with_capacity(children.len());
                for child_id in children {
                    let child = get_user(db, *child_id).await?;
                    refs.push(StudentRef {
                        id: child.id,
                        name: child.full_name(),
                    });
                }
                (None, None, 0, refs)
            }
            RoleData::Admin | RoleData::Teacher => (None, None, 0, Vec::new()),
        };

        responses.push(AdminUserResponse {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            role: u.role().to_string(),
            created_at: u.created_at.to_rfc3339(),
            grade_level,
            class_section,
            total_demerits,
            children,
        });
    }

    Ok(Json(responses))
}

#[derive(Deserialize, Validate, Clone)]
pub struct UserRegistrationRequest {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    username: String,
    #[validate(email(message = "Invalid email address"))]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    role: String,
    first_name: String,
    last_name: String,
}

#[post("/register", data = "<registration>")]
pub async fn api_register_user(
    registration: Json<UserRegistrationRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;

    let validated = registration.validate_custom()?;
    let role = Role::from_str(&validated.role).validate_custom()?;

    create_user(
        db,
        &validated.username,
        &validated.email,
        &validated.password,
        role,
        &validated.first_name,
        &validated.last_name,
    )
    .await
    .validate_custom()?;

    Ok(Status::Created)
}

#[derive(Deserialize)]
pub struct UserUpdateRequest {
    username: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
    role: Option<String>,
    grade_level: Option<i64>,
    class_section: Option<String>,
    children: Option<Vec<i64>>,
}

#[derive(Serialize)]
pub struct UpdateUserResponse {
    pub status: &'static str,
    /// Set when the user record updated but a secondary step (the
    /// parent-link sync) failed; the update itself is not rolled back.
    pub warning: Option<String>,
}

#[put("/admin/users/<id>", data = "<update>")]
pub async fn api_update_user(
    id: i64,
    update: Json<UserUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UpdateUserResponse>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;

    let current = get_user(db, id).await.validate_custom()?;

    let username = update.username.clone().unwrap_or(current.username.clone());
    let email = update.email.clone().unwrap_or(current.email.clone());
    let first_name = update
        .first_name
        .clone()
        .unwrap_or(current.first_name.clone());
    let last_name = update.last_name.clone().unwrap_or(current.last_name.clone());

    update_user_admin(db, id, &username, &email, &first_name, &last_name)
        .await
        .validate_custom()?;

    if let Some(password) = &update.password {
        update_user_password(db, id, password).await.validate_custom()?;
    }

    let mut target_role = current.role();
    if let Some(role_str) = &update.role {
        let new_role = Role::from_str(role_str).validate_custom()?;
        let updated = update_user_role(db, id, new_role).await.validate_custom()?;
        target_role = updated.role();
    }

    if target_role == Role::Student
        && (update.grade_level.is_some() || update.class_section.is_some())
    {
        let (current_grade, current_class) = match &current.role {
            RoleData::Student {
                grade_level,
                class_section,
            } => (*grade_level, class_section.clone()),
            _ => (None, None),
        };

        let grade_level = update.grade_level.or(current_grade);
        let class_section = update.class_section.clone().or(current_class);

        update_student_profile(db, id, grade_level, class_section.as_deref())
            .await
            .validate_custom()?;
    }

    // The link sync after a successful user update is best-effort: failure is
    // reported as a warning, not rolled back.
    let mut warning = None;
    if target_role == Role::Parent {
        if let Some(children) = &update.children {
            if let Err(err) = replace_parent_links(db, id, children).await {
                err.log_and_record("Parent link sync after user update");
                warning = Some(format!(
                    "User updated, but syncing children failed: {}",
                    err
                ));
            }
        }
    }

    Ok(Json(UpdateUserResponse {
        status: "success",
        warning,
    }))
}

#[derive(Deserialize)]
pub struct ParentLinkRequest {
    parent_id: i64,
    student_id: i64,
}

#[post("/links", data = "<request>")]
pub async fn api_add_link(
    request: Json<ParentLinkRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageLinks)
        .validate_custom()?;

    add_parent_link(db, request.parent_id, request.student_id)
        .await
        .validate_custom()?;

    Ok(Status::Ok)
}

#[derive(Deserialize)]
pub struct ReplaceLinksRequest {
    parent_id: i64,
    student_ids: Vec<i64>,
}

#[post("/links/replace", data = "<request>")]
pub async fn api_replace_links(
    request: Json<ReplaceLinksRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageLinks)
        .validate_custom()?;

    replace_parent_links(db, request.parent_id, &request.student_ids)
        .await
        .validate_custom()?;

    Ok(Status::Ok)
}

#[get("/links")]
pub async fn api_get_links(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<ParentLink>>, Status> {
    user.require_permission(Permission::ManageLinks)?;

    let links = get_all_parent_links(db).await?;

    Ok(Json(links))
}

#[get("/admin/parents")]
pub async fn api_get_parents(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, Status> {
    user.require_permission(Permission::ManageUsers)?;

    let parents = get_users_by_role(db, Role::Parent).await?;

    Ok(Json(parents.into_iter().map(UserData::from).collect()))
}

#[derive(Deserialize)]
pub struct ImportRequest {
    csv: String,
}

#[post("/admin/import", data = "<request>")]
pub async fn api_import_students(
    request: Json<ImportRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ImportOutcome>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ImportStudents)
        .validate_custom()?;

    let outcome = import_students_csv(db, &request.csv)
        .await
        .validate_custom()?;

    Ok(Json(outcome))
}

#[derive(Deserialize, Validate, Clone)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    last_name: String,
}

#[put("/profile", data = "<profile>")]
pub async fn api_update_profile(
    profile: Json<ProfileUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::EditOwnProfile)
        .validate_custom()?;

    let validated = profile.validate_custom()?;

    update_user_names(db, user.id, &validated.first_name, &validated.last_name)
        .await
        .validate_custom()?;

    Ok(Status::Ok)
}

#[derive(Deserialize, Validate)]
pub struct PasswordChangeRequest {
    current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    new_password: String,
}

#[post("/change-password", data = "<password>")]
pub async fn api_change_password(
    password: Json<PasswordChangeRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    let validated = password.validate_custom()?;

    let is_valid = authenticate_user(db, &user.username, &validated.current_password)
        .await
        .validate_custom()?;

    match is_valid {
        Some(_) => {
            update_user_password(db, user.id, &validated.new_password)
                .await
                .validate_custom()?;

            Ok(Status::Ok)
        }
        _ => Err(Custom(
            Status::Unauthorized,
            Json(ValidationResponse::with_error(
                "current_password",
                "Current password is incorrect",
            )),
        )),
    }
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
