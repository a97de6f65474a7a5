use demerit_tracker::database::{CURRENT_SCHEMA, get_schema_changes};
use sqlx::SqlitePool;

#[tokio::main]
async fn main() {
    let database_url = std::env::var("DATABASE_URL").expect("Failed to find database url");

    let pool = SqlitePool::connect(&database_url)
        .await
        .expect("Failed to connect to SQLite database");

    let diff = get_schema_changes(pool, CURRENT_SCHEMA)
        .await
        .expect("Failed to check for schema changes");

    if !diff.is_destructive() {
        println!("Changes passed the check ✓");
        return;
    }

    println!("Destructive changes detected:");

    for table in &diff.removed_tables {
        println!("    Table removed: {}", table);
    }

    for index in &diff.removed_indices {
        println!("    Index removed: {}", index);
    }

    for table in &diff.modified_tables {
        for column in &table.removed_columns {
            println!("    Column removed from table {}: {}", table.name, column);
        }
    }

    std::process::exit(1);
}
