//! Table creation statements for the SQLite provider.
//!
//! Centralizing the DDL keeps the provider logic clean and isolates the
//! database-specific syntax. Cascade and nullify rules are declared here for
//! documentation, but the stores enforce them explicitly inside their own
//! transactions rather than relying on the engine's foreign-key mode.

pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT UNIQUE,
        password_digest TEXT NOT NULL,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        phone_number TEXT,
        company_name TEXT,
        role TEXT NOT NULL DEFAULT 'other',
        is_staff INTEGER NOT NULL DEFAULT 0,
        is_superuser INTEGER NOT NULL DEFAULT 0,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS forms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        created_by TEXT REFERENCES users(id) ON DELETE SET NULL,
        version INTEGER NOT NULL DEFAULT 1,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS fields (
        id TEXT PRIMARY KEY,
        form_id TEXT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        field_type TEXT NOT NULL,
        options TEXT NOT NULL DEFAULT '{}',
        is_required INTEGER NOT NULL DEFAULT 0,
        field_order INTEGER NOT NULL DEFAULT 0,
        is_conditional INTEGER NOT NULL DEFAULT 0,
        conditional_field_id TEXT REFERENCES fields(id) ON DELETE SET NULL,
        conditional_operator TEXT,
        conditional_value TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (form_id, name)
    )",
    "CREATE TABLE IF NOT EXISTS submissions (
        id TEXT PRIMARY KEY,
        form_id TEXT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
        user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
        data TEXT NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'pending',
        submitted_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        submission_id TEXT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
        field_id TEXT NOT NULL REFERENCES fields(id) ON DELETE CASCADE,
        file_ref TEXT NOT NULL,
        byte_len INTEGER NOT NULL DEFAULT 0,
        uploaded_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_fields_form ON fields (form_id)",
    "CREATE INDEX IF NOT EXISTS idx_submissions_form ON submissions (form_id)",
    "CREATE INDEX IF NOT EXISTS idx_submissions_user ON submissions (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_submission ON documents (submission_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_field ON documents (field_id)",
];
