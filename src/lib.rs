#[macro_use]
extern crate rocket;

pub mod aggregate;
pub mod api;
pub mod auth;
pub mod database;
pub mod db;
pub mod env;
pub mod error;
pub mod import;
pub mod models;
pub mod telemetry;
pub mod validation;

#[cfg(test)]
mod test;

use api::{
    api_add_link, api_change_password, api_create_demerit, api_get_all_users, api_get_categories,
    api_get_children_summary, api_get_demerits, api_get_distribution, api_get_issued_demerits,
    api_get_links, api_get_parents, api_get_student_summaries, api_get_students, api_get_trend,
    api_import_students, api_login, api_logout, api_me, api_me_unauthorized, api_register_user,
    api_replace_links, api_update_profile, api_update_user, health,
};
use auth::{forbidden_api, unauthorized_api};
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use telemetry::TelemetryFairing;
use tracing::info;

pub async fn init_rocket(pool: SqlitePool) -> Rocket<Build> {
    info!("Starting demerit tracker");

    rocket::build()
        .manage(pool)
        .mount(
            "/api",
            routes![
                api_login,
                api_logout,
                api_me,
                api_me_unauthorized,
                api_create_demerit,
                api_get_demerits,
                api_get_issued_demerits,
                api_get_students,
                api_get_student_summaries,
                api_get_children_summary,
                api_get_categories,
                api_get_distribution,
                api_get_trend,
                api_get_all_users,
                api_register_user,
                api_update_user,
                api_add_link,
                api_replace_links,
                api_get_links,
                api_get_parents,
                api_import_students,
                api_update_profile,
                api_change_password,
            ],
        )
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
}
