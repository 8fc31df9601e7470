pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod utils;

use actix_cors::Cors;
use actix_web::web;
use config::AppConfig;
use db::task_repository::TaskRepository;
use db::user_repository::UserRepository;
use db::Database;
use errors::AppError;
use middleware::auth::AuthMiddleware;
use tracing::warn;
use utils::auth::TokenService;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::tasks::list_tasks,
        handlers::tasks::create_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,
    ),
    components(
        schemas(
            handlers::health::HealthResponse,
            handlers::tasks::DeleteTaskResponse,
            models::user::RegisterRequest,
            models::user::LoginRequest,
            models::user::AuthResponse,
            models::user::PublicUser,
            models::task::Task,
            models::task::NewTask,
            models::task::TaskPatch,
            errors::ErrorBody,
            errors::FieldViolation,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Authentication", description = "Registration, login and session endpoints"),
        (name = "Tasks", description = "Per-user task management, requires JWT authentication")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build(),
                ),
            );
        }
    }
}

/// Shared handles registered as application data on every worker.
#[derive(Clone)]
pub struct AppState {
    pub users: web::Data<UserRepository>,
    pub tasks: web::Data<TaskRepository>,
    pub tokens: web::Data<TokenService>,
    pub api_prefix: String,
}

impl AppState {
    pub fn new(database: Database, config: &AppConfig) -> Self {
        AppState {
            users: web::Data::new(UserRepository::new(database.clone())),
            tasks: web::Data::new(TaskRepository::new(database)),
            tokens: web::Data::new(TokenService::new(
                &config.jwt_secret,
                config.jwt_expiry_minutes,
            )),
            api_prefix: config.api_prefix.clone(),
        }
    }

    /// Registers application data and every API route under the configured prefix.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.users.clone())
            .app_data(self.tasks.clone())
            .app_data(self.tokens.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                warn!(error = %err, "Rejected request body");
                AppError::BadRequest("Invalid request body".to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                warn!(error = %err, "Rejected request path");
                AppError::BadRequest("Invalid path".to_string()).into()
            }))
            .service(
                web::scope(&self.api_prefix)
                    // Public routes
                    .route("/health", web::get().to(handlers::health::health))
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(handlers::auth::register))
                            .route("/login", web::post().to(handlers::auth::login))
                            .service(
                                web::resource("/me")
                                    .wrap(AuthMiddleware)
                                    .route(web::get().to(handlers::auth::me)),
                            ),
                    )
                    // Protected routes
                    .service(
                        web::scope("/tasks")
                            .wrap(AuthMiddleware)
                            .route("", web::get().to(handlers::tasks::list_tasks))
                            .route("", web::post().to(handlers::tasks::create_task))
                            .route("/{id}", web::put().to(handlers::tasks::update_task))
                            .route("/{id}", web::delete().to(handlers::tasks::delete_task)),
                    ),
            );
    }
}

pub fn cors(config: &AppConfig) -> Cors {
    let cors = if config.allows_any_origin() {
        Cors::default().allow_any_origin()
    } else {
        config
            .cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![
            actix_web::http::header::AUTHORIZATION,
            actix_web::http::header::ACCEPT,
            actix_web::http::header::CONTENT_TYPE,
        ])
        .max_age(3600)
}
