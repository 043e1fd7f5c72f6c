// Warehouse 231 / Contents Manager backend
use actix_cors::Cors;
use actix_files::Files;
use actix_web::{
    error::JsonPayloadError,
    middleware::Logger,
    web::{self, JsonConfig},
    App, HttpResponse, HttpServer, Responder,
};
use std::sync::Arc;

// Module declarations
mod cli;
mod config;
mod db;
mod error;
mod handlers;
mod import;
mod lightspeed;
mod logging;
mod middleware;
mod models;
mod routes;
mod time;
mod types;
mod validation;

use cli::Cli;
use db::TableNamespace;
use lightspeed::{SalesClient, TokenManager};

/// Simple index route
async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "name": "Contents Manager API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// JSON error handler for better error messages
fn json_error_handler(err: JsonPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    use types::ErrorResponse;
    let error_response = ErrorResponse::new("json_parse_error", format!("Invalid JSON: {}", err));
    let body = HttpResponse::BadRequest().json(error_response);
    actix_web::error::InternalError::from_response(err, body).into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    logging::init_logging(cli.verbose).expect("Failed to initialize logging");
    logging::print_build_info();

    // Load configuration
    let mut cfg = config::load_config_from_file(&cli.config);
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }
    if let Some(host) = &cli.host {
        cfg.server.host = host.clone();
    }

    let db_url = config::database_url_from_env_or_config(cli.database_url.as_deref(), &cfg);

    // Handle CLI commands
    if let Some(command) = &cli.command {
        match command {
            cli::Commands::Db { action } => {
                let pool = db::build_pool(&db_url, cfg.database.max_connections as usize)
                    .expect("Failed to create database pool");
                match action {
                    cli::DbCommands::Test => {
                        println!("Testing database connection...");
                        db::test_connection(&pool)
                            .await
                            .expect("Database connection failed");
                        println!("✓ Database connection successful");
                        return Ok(());
                    }
                    cli::DbCommands::Init => {
                        let ns = TableNamespace::detect(&pool)
                            .await
                            .expect("Failed to detect schema");
                        db::ensure_schema(&pool, &ns)
                            .await
                            .expect("Failed to create tables");
                        println!("✓ Tables ready in schema '{}'", ns.as_str());
                        return Ok(());
                    }
                    cli::DbCommands::Import { input } => {
                        let ns = TableNamespace::detect(&pool)
                            .await
                            .expect("Failed to detect schema");
                        db::ensure_schema(&pool, &ns)
                            .await
                            .expect("Failed to create tables");
                        let path = input.as_deref().unwrap_or(&cfg.csv_import_path);
                        let imported = import::import_items(&pool, &ns, path)
                            .await
                            .expect("CSV import failed");
                        println!("✓ Imported {} items from {}", imported, path);
                        return Ok(());
                    }
                }
            }
            cli::Commands::Serve => {}
        }
    }

    // Database pool and table namespace are resolved once at startup; the
    // namespace never changes while the server runs.
    let pool = db::build_pool(&db_url, cfg.database.max_connections as usize)
        .expect("Failed to create database pool");
    let ns = TableNamespace::detect(&pool)
        .await
        .expect("Failed to detect schema");
    if let Err(e) = db::ensure_schema(&pool, &ns).await {
        logging::log_warning(&format!("Could not ensure tables exist: {}", e));
    }

    if let Err(e) = std::fs::create_dir_all(&cfg.uploads_dir) {
        logging::log_warning(&format!(
            "Could not create uploads dir {}: {}",
            cfg.uploads_dir, e
        ));
    }
    log::info!("Uploads directory: {}", cfg.uploads_dir);
    log::info!("Tables in schema: {}", ns.as_str());

    // Lightspeed integration state
    let http = reqwest::Client::new();
    let tokens = Arc::new(TokenManager::new(cfg.lightspeed.clone()));
    let sales = SalesClient::new(http.clone(), tokens.clone(), cfg.lightspeed.clone());

    logging::log_server_startup(&cfg.server.host, cfg.server.port);
    let bind_address = format!("{}:{}", cfg.server.host, cfg.server.port);

    // Wrap shared state
    let pool_data = web::Data::new(pool);
    let ns_data = web::Data::new(ns);
    let cfg_data = web::Data::new(cfg.clone());
    let http_data = web::Data::new(http);
    let tokens_data = web::Data::from(tokens);
    let sales_data = web::Data::new(sales);
    let uploads_dir = cfg.uploads_dir.clone();

    // Clone CORS rules for use in the HttpServer closure
    let cors_rules = cfg.cors_rules.clone();

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let rules_clone = cors_rules.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req| {
                let origin_str = origin.to_str().unwrap_or("");
                config::is_origin_allowed(&rules_clone, origin_str)
            })
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            // Configure JSON limits and error handling
            .app_data(
                JsonConfig::default()
                    .limit(1024 * 1024) // 1MB limit
                    .error_handler(json_error_handler),
            )
            // Shared application state
            .app_data(pool_data.clone())
            .app_data(ns_data.clone())
            .app_data(cfg_data.clone())
            .app_data(http_data.clone())
            .app_data(tokens_data.clone())
            .app_data(sales_data.clone())
            // Middleware
            .wrap(middleware::security::SecurityHeaders)
            .wrap(cors)
            .wrap(Logger::default())
            // Health check
            .service(routes::health::healthz)
            // OAuth entry points (redirect targets, not under /api)
            .service(handlers::sales::login)
            .service(handlers::sales::callback)
            // API routes
            .service(
                web::scope("/api")
                    .route("/", web::get().to(api_index))
                    .service(routes::health::health)
                    // Inventory
                    .service(handlers::items::list_items)
                    .service(handlers::items::create_item)
                    .service(handlers::items::export_items)
                    .service(handlers::items::get_item)
                    .service(handlers::items::delete_item)
                    .service(handlers::items::record_edit)
                    .service(handlers::items::list_edits)
                    .service(handlers::items::compare_item)
                    .service(handlers::items::item_label)
                    .service(handlers::items::client_totals)
                    .service(handlers::items::import_csv)
                    // Spaces and labels
                    .service(handlers::spaces::list_spaces)
                    .service(handlers::spaces::upsert_space)
                    .service(handlers::spaces::upload_space_image)
                    .service(handlers::spaces::list_labels)
                    .service(handlers::spaces::create_label)
                    .service(handlers::spaces::delete_label)
                    // Sales dashboard
                    .service(handlers::sales::sales_daily),
            )
            // Uploaded space photos
            .service(Files::new("/uploads", uploads_dir.clone()))
            // Static files and SPA fallback (must be last)
            .service(
                Files::new("/", "./public")
                    .index_file("index.html")
                    .default_handler(web::to(routes::static_files::spa_fallback)),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
