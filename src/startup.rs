use crate::configuration::{ChatSettings, Settings};
use crate::connectors;
use crate::db;
use crate::helpers;
use crate::models;
use crate::routes;
use crate::services::Summarizer;
use actix_cors::Cors;
use actix_web::{dev::Server, middleware, web, App, HttpServer};
use sqlx::{Pool, Postgres};
use std::net::TcpListener;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

/// Registers every route. Shared by the server and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/health_check").service(routes::health_check))
        .service(
            web::scope("/api")
                .service(routes::chat::send_handler)
                .service(routes::chat::history_handler)
                .service(routes::memory::list_handler)
                .service(routes::memory::clear_handler)
                // JSON variant first, its guard lets multipart bodies through
                .service(routes::upload::url_handler)
                .service(routes::upload::file_handler),
        );
}

pub async fn run(
    listener: TcpListener,
    pg_pool: Pool<Postgres>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let registry = models::registry::init();
    tracing::info!(models = registry.len(), "Model registry initialized");

    let store = db::init(pg_pool);

    // Initialize external service connectors; disabled ones fall back to mocks
    let llm = connectors::init_llm(&settings.connectors);
    let storage = connectors::init_storage(&settings.connectors);
    let ocr = connectors::init_ocr(&settings.connectors);
    let summarizer = Summarizer::new(connectors::init_summarizer(&settings.connectors));
    tracing::info!(
        summaries = summarizer.is_enabled(),
        "Upload summaries configured"
    );
    let summarizer = web::Data::new(summarizer);

    let http_client = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    let http_client = web::Data::new(http_client);

    let chat_settings: web::Data<ChatSettings> = web::Data::new(settings.chat.clone());
    let static_dir = settings.static_dir.clone();
    let json_config = helpers::json_config();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(Cors::permissive())
            .app_data(json_config.clone())
            .app_data(store.clone())
            .app_data(llm.clone())
            .app_data(storage.clone())
            .app_data(ocr.clone())
            .app_data(summarizer.clone())
            .app_data(http_client.clone())
            .app_data(chat_settings.clone())
            .configure(configure)
            .service(actix_files::Files::new("/", &static_dir).index_file("index.html"))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
