use todo_app::config::AppConfig;
use todo_app::db::Database;
use todo_app::models::task::{NewTask, Task};
use todo_app::models::user::{Claims, User};
use todo_app::utils::auth::hash_password;
use todo_app::AppState;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub struct TestContext {
    pub state: AppState,
    pub config: AppConfig,
}

impl TestContext {
    pub fn new() -> Self {
        let config = AppConfig {
            jwt_secret: TEST_SECRET.to_string(),
            ..AppConfig::default()
        };
        let db = Database::temporary().expect("Failed to open temporary database");
        TestContext {
            state: AppState::new(db, &config),
            config,
        }
    }

    /// Path under the configured API prefix.
    pub fn api(&self, path: &str) -> String {
        format!("{}{}", self.config.api_prefix, path)
    }

    /// Inserts a user straight into the repository and returns `(user_id, token)`.
    #[allow(dead_code)]
    pub async fn create_test_user(&self, username: &str) -> (String, String) {
        let now = chrono::Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: format!("{}@test.com", username),
            password_hash: hash_password(TEST_PASSWORD).expect("Failed to hash password"),
            created_at: now,
            updated_at: now,
        };
        let user = self
            .state
            .users
            .create(user)
            .await
            .expect("Failed to create user");
        let token = self
            .state
            .tokens
            .issue(&user.id, &user.email)
            .expect("Failed to issue token");
        (user.id, token)
    }

    #[allow(dead_code)]
    pub async fn create_test_task(&self, user_id: &str, title: &str) -> Task {
        self.state
            .tasks
            .create(user_id, NewTask::new(title, None))
            .await
            .expect("Failed to create task")
    }

    /// Correctly signed token whose `exp` is already in the past.
    #[allow(dead_code)]
    pub fn expired_token(&self, user_id: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        self.state
            .tokens
            .sign(&Claims {
                sub: user_id.to_string(),
                email: "expired@test.com".to_string(),
                exp: now - 10,
                iat: now - 310,
            })
            .expect("Failed to sign token")
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
