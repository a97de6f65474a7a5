#[cfg(test)]
pub mod test_db {
    use crate::auth::Role;
    use crate::database::{CURRENT_SCHEMA, migrate_database_declaratively};
    use crate::db::{
        add_parent_link, create_category, create_demerit, create_user, update_student_profile,
    };
    use crate::error::AppError;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::Once;
    use tracing::log::LevelFilter;

    static INIT: Once = Once::new();
    static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        categories: Vec<TestCategory>,
        links: Vec<TestLink>,
        demerits: Vec<TestDemerit>,
    }

    pub struct TestUser {
        pub username: String,
        pub role: Role,
        pub password: String,
        pub grade_level: Option<i64>,
        pub class_section: Option<String>,
    }

    pub struct TestCategory {
        pub name: String,
        pub default_points: i64,
    }

    pub struct TestLink {
        pub parent_username: String,
        pub student_username: String,
    }

    pub struct TestDemerit {
        pub student_username: String,
        pub teacher_username: Option<String>,
        pub category_name: Option<String>,
        pub points: i64,
        pub description: String,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        fn user(mut self, username: &str, role: Role) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role,
                password: STANDARD_PASSWORD.to_string(),
                grade_level: None,
                class_section: None,
            });
            self
        }

        pub fn admin(self, username: &str) -> Self {
            self.user(username, Role::Admin)
        }

        pub fn teacher(self, username: &str) -> Self {
            self.user(username, Role::Teacher)
        }

        pub fn student(self, username: &str) -> Self {
            self.user(username, Role::Student)
        }

        pub fn student_in_class(mut self, username: &str, grade_level: i64, class_section: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Student,
                password: STANDARD_PASSWORD.to_string(),
                grade_level: Some(grade_level),
                class_section: Some(class_section.to_string()),
            });
            self
        }

        pub fn parent(self, username: &str) -> Self {
            self.user(username, Role::Parent)
        }

        pub fn user_with_password(mut self, username: &str, role: Role, password: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role,
                password: password.to_string(),
                grade_level: None,
                class_section: None,
            });
            self
        }

        pub fn category(mut self, name: &str, default_points: i64) -> Self {
            self.categories.push(TestCategory {
                name: name.to_string(),
                default_points,
            });
            self
        }

        pub fn link(mut self, parent_username: &str, student_username: &str) -> Self {
            self.links.push(TestLink {
                parent_username: parent_username.to_string(),
                student_username: student_username.to_string(),
            });
            self
        }

        pub fn demerit(self, student_username: &str, points: i64, description: &str) -> Self {
            self.demerit_in_category(student_username, None, points, description)
        }

        pub fn demerit_in_category(
            mut self,
            student_username: &str,
            category_name: Option<&str>,
            points: i64,
            description: &str,
        ) -> Self {
            self.demerits.push(TestDemerit {
                student_username: student_username.to_string(),
                teacher_username: None,
                category_name: category_name.map(String::from),
                points,
                description: description.to_string(),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .filter_level(LevelFilter::Debug)
                    .is_test(true)
                    .try_init();
            });

            // A single connection keeps every query on the same in-memory
            // database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?;

            migrate_database_declaratively(pool.clone(), CURRENT_SCHEMA, false).await?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut category_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let email = format!("{}@school.edu", user.username);
                let user_id = create_user(
                    &pool,
                    &user.username,
                    &email,
                    &user.password,
                    user.role,
                    &user.username,
                    "Test",
                )
                .await?;

                if user.role == Role::Student
                    && (user.grade_level.is_some() || user.class_section.is_some())
                {
                    update_student_profile(
                        &pool,
                        user_id,
                        user.grade_level,
                        user.class_section.as_deref(),
                    )
                    .await?;
                }

                user_id_map.insert(user.username.clone(), user_id);
            }

            for category in &self.categories {
                let category_id =
                    create_category(&pool, &category.name, category.default_points).await?;
                category_id_map.insert(category.name.clone(), category_id);
            }

            for link in &self.links {
                let parent_id = user_id_map[&link.parent_username];
                let student_id = user_id_map[&link.student_username];
                add_parent_link(&pool, parent_id, student_id).await?;
            }

            for demerit in &self.demerits {
                let student_id = user_id_map[&demerit.student_username];

                let teacher_id = match &demerit.teacher_username {
                    Some(username) => user_id_map[username],
                    None => self
                        .users
                        .iter()
                        .find(|u| u.role == Role::Teacher)
                        .map(|u| user_id_map[&u.username])
                        .expect("Test demerit requires a teacher in the builder"),
                };

                let category_id = match &demerit.category_name {
                    Some(name) => category_id_map[name],
                    None => *category_id_map
                        .values()
                        .next()
                        .expect("Test demerit requires a category in the builder"),
                };

                create_demerit(
                    &pool,
                    student_id,
                    teacher_id,
                    category_id,
                    demerit.points,
                    &demerit.description,
                )
                .await?;
            }

            Ok(TestDb {
                pool,
                user_id_map,
                category_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub category_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }

        pub fn category_id(&self, name: &str) -> Option<i64> {
            self.category_id_map.get(name).copied()
        }
    }

    /// Admin, teacher, two students, a parent linked to the first student,
    /// and the stock categories.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .admin("admin_user")
            .teacher("teacher_user")
            .student_in_class("student_user", 9, "A")
            .student_in_class("student_two", 10, "B")
            .parent("parent_user")
            .category("Late to Class", 1)
            .category("Disruptive Behavior", 3)
            .link("parent_user", "student_user")
            .build()
            .await
            .expect("Failed to build standard test database")
    }
}

#[cfg(test)]
pub mod test_client {
    use super::test_db::TestDb;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = crate::init_rocket(test_db.pool.clone()).await;
        let client = Client::tracked(rocket)
            .await
            .expect("Failed to build test client");

        (client, test_db)
    }

    /// Log in through the API; the tracked client keeps the session cookies
    /// for subsequent requests.
    pub async fn login_test_user(client: &Client, username: &str, password: &str) {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": username,
                    "password": password
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok, "Login request failed");
    }
}
