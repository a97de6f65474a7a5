pub const CURRENT_SCHEMA: &str = r#"
PRAGMA foreign_keys = 1;

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL DEFAULT '',
    role TEXT NOT NULL,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS student_profiles (
    user_id INTEGER PRIMARY KEY,
    grade_level INTEGER,
    class_section TEXT,
    FOREIGN KEY (user_id) REFERENCES users (id)
);

-- Uniqueness lives here, not in application code, so concurrent duplicate
-- inserts collapse to one row. Rowid preserves link-insertion order.
CREATE TABLE IF NOT EXISTS parent_links (
    id INTEGER PRIMARY KEY,
    parent_id INTEGER NOT NULL,
    student_id INTEGER NOT NULL,
    UNIQUE (parent_id, student_id),
    FOREIGN KEY (parent_id) REFERENCES users (id),
    FOREIGN KEY (student_id) REFERENCES users (id)
);

CREATE TABLE IF NOT EXISTS demerit_categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    default_points INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS demerit_records (
    id INTEGER PRIMARY KEY,
    student_id INTEGER NOT NULL,
    teacher_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    points INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    date_issued TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (student_id) REFERENCES users (id),
    FOREIGN KEY (teacher_id) REFERENCES users (id),
    FOREIGN KEY (category_id) REFERENCES demerit_categories (id)
);

CREATE INDEX IF NOT EXISTS idx_demerit_records_student ON demerit_records (student_id);

CREATE TABLE IF NOT EXISTS user_sessions (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    token TEXT NOT NULL UNIQUE,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    expires_at TIMESTAMP NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users (id)
);
"#;
