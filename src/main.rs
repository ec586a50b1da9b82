use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use levelboard_server::{avatar_files, configure_routes, cors, AppError, AppState, Settings};
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> levelboard_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Settings::new()?;
    info!(environment = %config.environment, "configuration loaded");

    let state = AppState::new(config.clone()).await?;
    tokio::fs::create_dir_all(state.avatars.dir()).await?;
    let data = web::Data::new(state.clone());

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!("Server is running on {}:{}", config.server.host, config.server.port);

    let server_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&server_config.cors))
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(configure_routes)
            .service(avatar_files(&server_config.uploads))
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;

    state.shutdown().await?;
    info!("server stopped");
    Ok(())
}
