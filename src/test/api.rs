#[cfg(test)]
mod tests {
    use crate::api::{DemeritResponse, LoginResponse};
    use crate::test::utils::test_client::{login_test_user, setup_test_client};
    use crate::test::utils::test_db::{TestDbBuilder, create_standard_test_db};
    use rocket::http::{ContentType, Cookie, Status};
    use serde_json::{Value, json};

    #[rocket::async_test]
    async fn test_login_api() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": "teacher_user",
                    "password": "password123"
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let login_response: LoginResponse = serde_json::from_str(&body).unwrap();

        assert!(login_response.success);
        assert!(login_response.user.is_some());
        assert_eq!(login_response.user.unwrap().username, "teacher_user");

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": "teacher_user",
                    "password": "wrong_password"
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let login_response: LoginResponse = serde_json::from_str(&body).unwrap();

        assert!(!login_response.success);
        assert!(login_response.error.is_some());
    }

    #[rocket::async_test]
    async fn test_auth_required_apis() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let endpoints = vec![
            "/api/me",
            "/api/demerits",
            "/api/students",
            "/api/students/summary",
            "/api/admin/users",
            "/api/analytics/trend",
        ];

        for endpoint in endpoints {
            let response = client.get(endpoint).dispatch().await;
            assert!(
                response.status() == Status::Unauthorized || response.status() == Status::SeeOther,
                "Endpoint {} did not require authentication",
                endpoint
            );
        }
    }

    #[rocket::async_test]
    async fn test_forged_session_token_rejected() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let forged_cookie = Cookie::build(("session_token", "fake_token")).build();

        let response = client
            .get("/api/me")
            .private_cookie(forged_cookie)
            .dispatch()
            .await;

        assert!(
            response.status() == Status::Unauthorized
                || response.status() == Status::SeeOther
                || response.status() == Status::Forbidden,
            "Forged session token was accepted"
        );

        login_test_user(&client, "teacher_user", "password123").await;

        let response = client.get("/api/me").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn test_teacher_creates_demerit_and_student_sees_it() {
        let test_db = create_standard_test_db().await;
        let student_id = test_db.user_id("student_user").unwrap();
        let category_id = test_db.category_id("Late to Class").unwrap();
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "teacher_user", "password123").await;

        let response = client
            .post("/api/demerits")
            .header(ContentType::JSON)
            .body(
                json!({
                    "student_id": student_id,
                    "category_id": category_id,
                    "points": 2,
                    "description": "Talking in class"
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().await.unwrap();
        let created: DemeritResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(created.student_id, student_id);
        assert_eq!(created.points, 2);

        // The student sees exactly their own record, at the head.
        login_test_user(&client, "student_user", "password123").await;

        let response = client.get("/api/demerits").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let records: Vec<DemeritResponse> = serde_json::from_str(&body).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, created.id);
        assert!(records.iter().all(|r| r.student_id == student_id));
    }

    #[rocket::async_test]
    async fn test_student_cannot_issue_demerits() {
        let test_db = create_standard_test_db().await;
        let student_id = test_db.user_id("student_two").unwrap();
        let category_id = test_db.category_id("Late to Class").unwrap();
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "student_user", "password123").await;

        let response = client
            .post("/api/demerits")
            .header(ContentType::JSON)
            .body(
                json!({
                    "student_id": student_id,
                    "category_id": category_id,
                    "points": 5,
                    "description": "should not work"
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn test_out_of_range_points_rejected_at_api() {
        let test_db = create_standard_test_db().await;
        let student_id = test_db.user_id("student_user").unwrap();
        let category_id = test_db.category_id("Late to Class").unwrap();
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "teacher_user", "password123").await;

        let response = client
            .post("/api/demerits")
            .header(ContentType::JSON)
            .body(
                json!({
                    "student_id": student_id,
                    "category_id": category_id,
                    "points": 9,
                    "description": "too many"
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::UnprocessableEntity);

        let body = response.into_string().await.unwrap();
        let error: Value = serde_json::from_str(&body).unwrap();
        assert!(error["errors"]["points"][0]
            .as_str()
            .unwrap()
            .contains("between 1 and 5"));
    }

    #[rocket::async_test]
    async fn test_role_outside_table_is_forbidden() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        // A teacher calling admin-only and parent-only endpoints.
        login_test_user(&client, "teacher_user", "password123").await;

        for endpoint in ["/api/admin/users", "/api/links", "/api/parent/children"] {
            let response = client.get(endpoint).dispatch().await;
            assert_eq!(
                response.status(),
                Status::Forbidden,
                "Endpoint {} should be forbidden for teachers",
                endpoint
            );
        }

        // A student calling teacher-only endpoints.
        login_test_user(&client, "student_user", "password123").await;

        for endpoint in ["/api/students", "/api/students/summary", "/api/analytics/trend"] {
            let response = client.get(endpoint).dispatch().await;
            assert_eq!(
                response.status(),
                Status::Forbidden,
                "Endpoint {} should be forbidden for students",
                endpoint
            );
        }
    }

    #[rocket::async_test]
    async fn test_parent_scoped_summaries() {
        let test_db = TestDbBuilder::new()
            .teacher("teacher_user")
            .student_in_class("child_one", 9, "A")
            .student_in_class("child_two", 9, "B")
            .student("other_student")
            .parent("parent_user")
            .parent("unrelated_parent")
            .category("Late to Class", 1)
            .link("parent_user", "child_one")
            .link("parent_user", "child_two")
            .demerit("child_one", 2, "")
            .demerit("child_two", 3, "")
            .demerit("child_two", 5, "")
            .demerit("other_student", 4, "")
            .build()
            .await
            .expect("Failed to build test database");

        let one = test_db.user_id("child_one").unwrap();
        let two = test_db.user_id("child_two").unwrap();
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "parent_user", "password123").await;

        let response = client.get("/api/parent/children").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let summaries: Vec<Value> = serde_json::from_str(&body).unwrap();

        assert_eq!(summaries.len(), 2);

        let totals: Vec<(i64, i64)> = summaries
            .iter()
            .map(|s| {
                (
                    s["student_id"].as_i64().unwrap(),
                    s["total_points"].as_i64().unwrap(),
                )
            })
            .collect();
        assert!(totals.contains(&(one, 2)));
        assert!(totals.contains(&(two, 8)));

        // An unrelated parent sees an empty set.
        login_test_user(&client, "unrelated_parent", "password123").await;

        let response = client.get("/api/parent/children").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let summaries: Vec<Value> = serde_json::from_str(&body).unwrap();
        assert!(summaries.is_empty());
    }

    #[rocket::async_test]
    async fn test_student_summaries_include_band_and_zero_rows() {
        let test_db = TestDbBuilder::new()
            .teacher("teacher_user")
            .student("banded_student")
            .student("clean_student")
            .category("Late to Class", 1)
            .demerit("banded_student", 2, "")
            .demerit("banded_student", 3, "")
            .demerit("banded_student", 2, "")
            .build()
            .await
            .expect("Failed to build test database");

        let banded = test_db.user_id("banded_student").unwrap();
        let clean = test_db.user_id("clean_student").unwrap();
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "teacher_user", "password123").await;

        let response = client.get("/api/students/summary").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let summaries: Vec<Value> = serde_json::from_str(&body).unwrap();

        let banded_row = summaries
            .iter()
            .find(|s| s["student_id"].as_i64() == Some(banded))
            .expect("Student with demerits missing from summary");
        assert_eq!(banded_row["total_points"].as_i64(), Some(7));
        assert_eq!(banded_row["band"].as_str(), Some("high"));

        let clean_row = summaries
            .iter()
            .find(|s| s["student_id"].as_i64() == Some(clean))
            .expect("Student without demerits missing from summary");
        assert_eq!(clean_row["total_points"].as_i64(), Some(0));
        assert_eq!(clean_row["band"].as_str(), Some("good"));
    }

    #[rocket::async_test]
    async fn test_admin_updates_user_and_role_cascade() {
        let test_db = create_standard_test_db().await;
        let student_id = test_db.user_id("student_user").unwrap();
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "admin_user", "password123").await;

        let response = client
            .put(format!("/api/admin/users/{}", student_id))
            .header(ContentType::JSON)
            .body(
                json!({
                    "first_name": "Renamed",
                    "role": "teacher"
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let result: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(result["status"].as_str(), Some("success"));
        assert!(result["warning"].is_null());

        let response = client.get("/api/admin/users").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let users: Vec<Value> = serde_json::from_str(&body).unwrap();

        let updated = users
            .iter()
            .find(|u| u["id"].as_i64() == Some(student_id))
            .expect("Updated user missing");
        assert_eq!(updated["first_name"].as_str(), Some("Renamed"));
        assert_eq!(updated["role"].as_str(), Some("teacher"));
        assert!(updated["grade_level"].is_null());
    }

    #[rocket::async_test]
    async fn test_link_management_via_api() {
        let test_db = create_standard_test_db().await;
        let parent_id = test_db.user_id("parent_user").unwrap();
        let student_two = test_db.user_id("student_two").unwrap();
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "admin_user", "password123").await;

        let response = client
            .post("/api/links")
            .header(ContentType::JSON)
            .body(
                json!({
                    "parent_id": parent_id,
                    "student_id": student_two
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        // Linking a non-parent is rejected with the role error kind.
        let response = client
            .post("/api/links")
            .header(ContentType::JSON)
            .body(
                json!({
                    "parent_id": student_two,
                    "student_id": parent_id
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);

        let response = client.get("/api/links").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let links: Vec<Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(links.len(), 2);
    }

    #[rocket::async_test]
    async fn test_csv_import_goes_through_validated_contracts() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "admin_user", "password123").await;

        let csv = "name,grade,class,demerits\nAlice Wong,9,A,7\nBob Tan,10,B,0\n";
        let response = client
            .post("/api/admin/import")
            .header(ContentType::JSON)
            .body(json!({ "csv": csv }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let outcome: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(outcome["success_count"].as_i64(), Some(2));
        assert_eq!(outcome["failure_count"].as_i64(), Some(0));
        assert_eq!(outcome["generated_passwords"].as_array().unwrap().len(), 2);

        // The imported balance lands in the ledger in valid-sized records.
        let response = client.get("/api/students/summary").dispatch().await;
        let body = response.into_string().await.unwrap();
        let summaries: Vec<Value> = serde_json::from_str(&body).unwrap();

        let alice = summaries
            .iter()
            .find(|s| s["student_name"].as_str().map(|n| n.starts_with("Alice")) == Some(true))
            .expect("Imported student missing from summary");
        assert_eq!(alice["total_points"].as_i64(), Some(7));
    }
}
