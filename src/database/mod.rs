pub mod migrations;
pub mod schema;

pub use migrations::{SchemaDiff, get_schema_changes, migrate_database_declaratively};
pub use schema::CURRENT_SCHEMA;
