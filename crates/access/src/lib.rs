//! # Access Crate
//!
//! The central authority for identity, authentication, and authorization:
//! user registration, credential verification, and the staff/superuser
//! checks the server enforces on admin routes. Usernames are the unique
//! login key; email is optional contact data.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use turso::{params, Database, Error as TursoError, Row, Value as TursoValue};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Database error: {0}")]
    Database(#[from] TursoError),
    #[error("a user named '{0}' already exists")]
    DuplicateUsername(String),
    #[error("the email address '{0}' is already registered")]
    DuplicateEmail(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0} not found")]
    NotFound(String),
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

/// Coarse business role. Authorization decisions use the staff and
/// superuser flags, not this label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Individual,
    BusinessOwner,
    FinancialAdvisor,
    Accountant,
    Other,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Individual => "individual",
            UserRole::BusinessOwner => "business_owner",
            UserRole::FinancialAdvisor => "financial_advisor",
            UserRole::Accountant => "accountant",
            UserRole::Other => "other",
        }
    }
}

impl FromStr for UserRole {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(UserRole::Individual),
            "business_owner" => Ok(UserRole::BusinessOwner),
            "financial_advisor" => Ok(UserRole::FinancialAdvisor),
            "accountant" => Ok(UserRole::Accountant),
            "other" => Ok(UserRole::Other),
            other => Err(AccessError::DataIntegrity(format!(
                "unknown user role '{other}'"
            ))),
        }
    }
}

/// A user account. The password digest never leaves this module.
#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub role: UserRole,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Staff and superusers both clear admin checks.
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    /// Where notifications about this user's submissions mention them:
    /// their email, or the username when no email is on file.
    pub fn contact_address(&self) -> String {
        self.email
            .clone()
            .unwrap_or_else(|| self.username.clone())
    }
}

/// Input for registering an account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: UserRole,
}

fn default_role() -> UserRole {
    UserRole::Other
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, phone_number, \
     company_name, role, is_staff, is_superuser, created_at";

impl TryFrom<&Row> for User {
    type Error = AccessError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let role: String = row.get(7)?;
        let created_at_str: String = row.get(10)?;
        let created_at =
            chrono::NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
                .map_err(|e| {
                    AccessError::DataIntegrity(format!(
                        "Failed to parse date '{created_at_str}': {e}"
                    ))
                })?;

        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: text_or_none(row, 2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            phone_number: text_or_none(row, 5)?,
            company_name: text_or_none(row, 6)?,
            role: role.parse()?,
            is_staff: row.get::<i64>(8)? != 0,
            is_superuser: row.get::<i64>(9)? != 0,
            created_at,
        })
    }
}

fn text_or_none(row: &Row, idx: usize) -> Result<Option<String>, AccessError> {
    Ok(match row.get_value(idx)? {
        TursoValue::Text(s) => Some(s),
        _ => None,
    })
}

fn digest(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
}

/// Registers a new account. Usernames are unique; so are emails when given.
pub async fn register_user(db: &Database, new: NewUser) -> Result<User, AccessError> {
    let conn = db.connect()?;

    let mut rows = conn
        .query(
            "SELECT 1 FROM users WHERE username = ? LIMIT 1",
            params![new.username.clone()],
        )
        .await?;
    if rows.next().await?.is_some() {
        return Err(AccessError::DuplicateUsername(new.username));
    }

    if let Some(email) = &new.email {
        let mut rows = conn
            .query(
                "SELECT 1 FROM users WHERE email = ? LIMIT 1",
                params![email.clone()],
            )
            .await?;
        if rows.next().await?.is_some() {
            return Err(AccessError::DuplicateEmail(email.clone()));
        }
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO users (id, username, email, password_digest, first_name, last_name, \
         phone_number, company_name, role) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            TursoValue::Text(id.clone()),
            TursoValue::Text(new.username.clone()),
            opt_text(new.email.as_deref()),
            TursoValue::Text(digest(&new.password)),
            TursoValue::Text(new.first_name),
            TursoValue::Text(new.last_name),
            opt_text(new.phone_number.as_deref()),
            opt_text(new.company_name.as_deref()),
            TursoValue::Text(new.role.as_str().to_string()),
        ],
    )
    .await?;

    info!(username = %new.username, id = %id, "registered user");
    get_user(db, &id).await
}

fn opt_text(value: Option<&str>) -> TursoValue {
    match value {
        Some(s) => TursoValue::Text(s.to_string()),
        None => TursoValue::Null,
    }
}

pub async fn get_user(db: &Database, id: &str) -> Result<User, AccessError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
            params![id.to_string()],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| AccessError::NotFound(format!("user '{id}'")))?;
    User::try_from(&row)
}

pub async fn get_user_by_username(db: &Database, username: &str) -> Result<User, AccessError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"),
            params![username.to_string()],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| AccessError::NotFound(format!("user '{username}'")))?;
    User::try_from(&row)
}

/// Checks a username/password pair. A wrong password and an unknown
/// username produce the same error, so callers leak nothing.
pub async fn verify_credentials(
    db: &Database,
    username: &str,
    password: &str,
) -> Result<User, AccessError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = ? AND password_digest = ?"
            ),
            params![username.to_string(), digest(password)],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or(AccessError::InvalidCredentials)?;
    User::try_from(&row)
}

/// Every account, oldest first.
pub async fn list_users(db: &Database) -> Result<Vec<User>, AccessError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, username ASC"),
            (),
        )
        .await?;
    let mut users = Vec::new();
    while let Some(row) = rows.next().await? {
        users.push(User::try_from(&row)?);
    }
    Ok(users)
}

/// Grants or revokes the staff flag.
pub async fn set_staff(db: &Database, id: &str, is_staff: bool) -> Result<User, AccessError> {
    let conn = db.connect()?;
    get_user(db, id).await?;
    conn.execute(
        "UPDATE users SET is_staff = ? WHERE id = ?",
        params![is_staff as i64, id.to_string()],
    )
    .await?;
    get_user(db, id).await
}

/// Deletes an account. Forms the user created and submissions they filed
/// survive with the reference cleared.
pub async fn delete_user(db: &Database, id: &str) -> Result<(), AccessError> {
    let conn = db.connect()?;
    get_user(db, id).await?;

    conn.execute("BEGIN IMMEDIATE", ()).await?;
    let result = async {
        conn.execute(
            "UPDATE forms SET created_by = NULL WHERE created_by = ?",
            params![id.to_string()],
        )
        .await?;
        conn.execute(
            "UPDATE submissions SET user_id = NULL WHERE user_id = ?",
            params![id.to_string()],
        )
        .await?;
        conn.execute("DELETE FROM users WHERE id = ?", params![id.to_string()])
            .await?;
        Ok::<(), AccessError>(())
    }
    .await;
    match result {
        Ok(()) => {
            conn.execute("COMMIT", ()).await?;
            info!(user_id = %id, "deleted user, references cleared");
            Ok(())
        }
        Err(e) => {
            let _ = conn.execute("ROLLBACK", ()).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboard::provider::SqliteProvider;

    async fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let provider = SqliteProvider::new(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        provider.initialize_schema().await.unwrap();
        (provider.db, dir)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: None,
            password: "s3cret".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            company_name: None,
            role: UserRole::Individual,
        }
    }

    #[test]
    fn every_role_label_round_trips() {
        for (role, label) in [
            (UserRole::Individual, "individual"),
            (UserRole::BusinessOwner, "business_owner"),
            (UserRole::FinancialAdvisor, "financial_advisor"),
            (UserRole::Accountant, "accountant"),
            (UserRole::Other, "other"),
        ] {
            assert_eq!(role.as_str(), label);
            assert_eq!(label.parse::<UserRole>().unwrap(), role);
        }
        assert!(matches!(
            "client".parse::<UserRole>().unwrap_err(),
            AccessError::DataIntegrity(_)
        ));
    }

    #[tokio::test]
    async fn register_then_verify_credentials() {
        let (db, _dir) = test_db().await;

        let user = register_user(&db, new_user("ada")).await.unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(user.role, UserRole::Individual);
        assert!(!user.is_admin());

        let verified = verify_credentials(&db, "ada", "s3cret").await.unwrap();
        assert_eq!(verified.id, user.id);

        let err = verify_credentials(&db, "ada", "wrong").await.unwrap_err();
        assert!(matches!(err, AccessError::InvalidCredentials));
        let err = verify_credentials(&db, "nobody", "s3cret").await.unwrap_err();
        assert!(matches!(err, AccessError::InvalidCredentials));
    }

    #[tokio::test]
    async fn usernames_and_emails_are_unique() {
        let (db, _dir) = test_db().await;

        register_user(&db, new_user("ada")).await.unwrap();
        let err = register_user(&db, new_user("ada")).await.unwrap_err();
        assert!(matches!(err, AccessError::DuplicateUsername(_)));

        let mut with_email = new_user("grace");
        with_email.email = Some("grace@example.com".to_string());
        register_user(&db, with_email.clone()).await.unwrap();

        with_email.username = "grace2".to_string();
        let err = register_user(&db, with_email).await.unwrap_err();
        assert!(matches!(err, AccessError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn contact_address_falls_back_to_username() {
        let (db, _dir) = test_db().await;

        let plain = register_user(&db, new_user("ada")).await.unwrap();
        assert_eq!(plain.contact_address(), "ada");

        let mut with_email = new_user("grace");
        with_email.email = Some("grace@example.com".to_string());
        let user = register_user(&db, with_email).await.unwrap();
        assert_eq!(user.contact_address(), "grace@example.com");
    }

    #[tokio::test]
    async fn staff_flag_controls_admin_checks() {
        let (db, _dir) = test_db().await;

        let user = register_user(&db, new_user("ada")).await.unwrap();
        assert!(!user.is_admin());

        let promoted = set_staff(&db, &user.id, true).await.unwrap();
        assert!(promoted.is_admin());
    }

    #[tokio::test]
    async fn deleting_a_user_clears_references_but_keeps_rows() {
        let (db, _dir) = test_db().await;
        let user = register_user(&db, new_user("ada")).await.unwrap();

        // A form created by the user survives their deletion with the
        // creator reference nulled.
        let conn = db.connect().unwrap();
        conn.execute(
            "INSERT INTO forms (id, name, created_by) VALUES ('f1', 'KYC', ?)",
            params![user.id.clone()],
        )
        .await
        .unwrap();
        conn.execute(
            "INSERT INTO submissions (id, form_id, user_id) VALUES ('s1', 'f1', ?)",
            params![user.id.clone()],
        )
        .await
        .unwrap();

        delete_user(&db, &user.id).await.unwrap();
        assert!(matches!(
            get_user(&db, &user.id).await.unwrap_err(),
            AccessError::NotFound(_)
        ));

        let mut rows = conn
            .query("SELECT created_by FROM forms WHERE id = 'f1'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert!(matches!(row.get_value(0).unwrap(), TursoValue::Null));

        let mut rows = conn
            .query("SELECT user_id FROM submissions WHERE id = 's1'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert!(matches!(row.get_value(0).unwrap(), TursoValue::Null));
    }
}
