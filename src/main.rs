use actix_web::{App, HttpServer};
use todo_app::config::AppConfig;
use todo_app::db::Database;
use todo_app::{cors, ApiDoc, AppState};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // Initialize tracing subscriber for structured logging
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .json()
        .init();

    if config.uses_default_secret() {
        warn!("JWT_SECRET not set - using the built-in default secret, NOT SECURE FOR PRODUCTION");
    }

    let database = Database::new(&config.db_path).map_err(std::io::Error::other)?;
    info!(db_path = %config.db_path, "Database initialized");

    let state = AppState::new(database.clone(), &config);
    let bind_address = config.bind_address();
    let prefix = config.api_prefix.clone();

    info!(bind_address = %bind_address, "Starting task API server");
    info!("Available endpoints:");
    info!("   GET    {}/health         - Health check (public)", prefix);
    info!("   POST   {}/auth/register  - Register new user (public)", prefix);
    info!("   POST   {}/auth/login     - Login user (public)", prefix);
    info!("   GET    {}/auth/me        - Current user (protected)", prefix);
    info!("   GET    {}/tasks          - List tasks (protected)", prefix);
    info!("   POST   {}/tasks          - Create task (protected)", prefix);
    info!("   PUT    {}/tasks/{{id}}     - Update task (protected)", prefix);
    info!("   DELETE {}/tasks/{{id}}     - Delete task (protected)", prefix);
    info!(
        swagger_url = format!("http://{}/swagger-ui/", bind_address),
        "Swagger UI available"
    );

    let server_config = config.clone();
    HttpServer::new(move || {
        let openapi = ApiDoc::openapi();
        let state = state.clone();

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors(&server_config))
            // Swagger UI
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .configure(|cfg| state.configure(cfg))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    database.flush().await.map_err(std::io::Error::other)?;
    info!("Database flushed, shutting down");
    Ok(())
}
