use actix_web::{web, App, HttpServer};
use chatdesk::configuration::{get_configuration, ChatSettings, DatabaseSettings};
use chatdesk::connectors::llm::mock::MockLlmConnector;
use chatdesk::connectors::ocr::mock::MockOcrConnector;
use chatdesk::connectors::storage::mock::MockStorageConnector;
use chatdesk::connectors::{LlmConnector, OcrConnector, StorageConnector};
use chatdesk::db::{mock::InMemoryChatStore, ChatStore};
use chatdesk::services::Summarizer;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::net::TcpListener;
use std::sync::Arc;

/// Collaborators wired into a test server. Every field has a working mock default.
pub struct TestDeps {
    pub store: Arc<dyn ChatStore>,
    pub llm: Arc<dyn LlmConnector>,
    pub storage: Arc<dyn StorageConnector>,
    pub ocr: Arc<dyn OcrConnector>,
    pub summarizer: Summarizer,
    pub chat: ChatSettings,
}

impl Default for TestDeps {
    fn default() -> Self {
        Self {
            store: Arc::new(InMemoryChatStore::new()),
            llm: Arc::new(MockLlmConnector::new("hello")),
            storage: Arc::new(MockStorageConnector::default()),
            ocr: Arc::new(MockOcrConnector::new("text from image")),
            summarizer: Summarizer::disabled(),
            chat: ChatSettings::default(),
        }
    }
}

pub struct TestApp {
    pub address: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

pub fn spawn_app(deps: TestDeps) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = web::Data::new(deps.store);
    let llm = web::Data::new(deps.llm);
    let storage = web::Data::new(deps.storage);
    let ocr = web::Data::new(deps.ocr);
    let summarizer = web::Data::new(deps.summarizer);
    let chat = web::Data::new(deps.chat);
    let http_client = web::Data::new(reqwest::Client::new());

    let server = HttpServer::new(move || {
        App::new()
            .app_data(chatdesk::helpers::json_config())
            .app_data(store.clone())
            .app_data(llm.clone())
            .app_data(storage.clone())
            .app_data(ocr.clone())
            .app_data(summarizer.clone())
            .app_data(chat.clone())
            .app_data(http_client.clone())
            .configure(chatdesk::startup::configure)
    })
    .listen(listener)
    .expect("Failed to listen")
    .run();

    let _ = tokio::spawn(server);
    TestApp { address }
}

/// Fresh database with migrations applied, `None` when postgres is unreachable.
pub async fn spawn_database() -> Option<PgPool> {
    let mut configuration = get_configuration().ok()?;
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();

    match configure_database(&configuration.database).await {
        Ok(pool) => Some(pool),
        Err(err) => {
            eprintln!("Skipping tests: failed to connect to postgres: {}", err);
            None
        }
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let mut connection = PgConnection::connect(&config.connection_string_without_db()).await?;

    connection
        .execute(format!(r#"CREATE DATABASE "{}""#, config.database_name).as_str())
        .await?;

    let connection_pool = PgPool::connect(&config.connection_string()).await?;

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await?;

    Ok(connection_pool)
}
