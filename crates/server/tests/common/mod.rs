//! Shared test harness: spawns the full server on a random port against a
//! throwaway database, with a recording notification dispatcher.

use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};
use onboard::notify::RecordingDispatcher;
use onboard_access::{register_user, set_staff, NewUser, User, UserRole};
use onboard_server::{
    auth::middleware::Claims, config::AppConfig, router::create_router,
    state::build_app_state_with_dispatcher,
};
use tempfile::TempDir;
use turso::Database;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub db: Database,
    pub dispatcher: Arc<RecordingDispatcher>,
    // Held so the database and upload files outlive the test body.
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = AppConfig {
            port: 0,
            db_url: dir
                .path()
                .join("test.db")
                .to_str()
                .expect("temp path is not UTF-8")
                .to_string(),
            upload_root: dir
                .path()
                .to_str()
                .expect("temp path is not UTF-8")
                .to_string(),
            admin_contact: "admins@example.com".to_string(),
            token_ttl_secs: 3_600,
        };

        let dispatcher = Arc::new(RecordingDispatcher::new());
        let app_state = build_app_state_with_dispatcher(config, dispatcher.clone())
            .await
            .expect("failed to build app state");
        let db = app_state.sqlite_provider.db.clone();
        let app = create_router(app_state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let address = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server crashed");
        });

        TestApp {
            address,
            client: reqwest::Client::new(),
            db,
            dispatcher,
            _dir: dir,
        }
    }

    /// Registers an account directly against the database and returns it
    /// with a valid login token.
    pub async fn seed_user(&self, username: &str, email: Option<&str>, staff: bool) -> (User, String) {
        let mut user = register_user(
            &self.db,
            NewUser {
                username: username.to_string(),
                email: email.map(str::to_string),
                password: "s3cret".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                phone_number: None,
                company_name: None,
                role: UserRole::Individual,
            },
        )
        .await
        .expect("failed to seed user");
        if staff {
            user = set_staff(&self.db, &user.id, true)
                .await
                .expect("failed to promote user");
        }
        let token = generate_jwt(&user.id);
        (user, token)
    }
}

/// Signs a token the way the server does, with the default secret.
pub fn generate_jwt(user_id: &str) -> String {
    let secret =
        std::env::var("JWT_SECRET").unwrap_or_else(|_| "a-secure-secret-key".to_string());
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3_600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .expect("failed to sign test token")
}
