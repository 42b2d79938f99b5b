use chatdesk::configuration::get_configuration;
use chatdesk::startup::run;
use chatdesk::telemetry::{get_subscriber, init_subscriber};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::io::{Error, ErrorKind};
use std::net::TcpListener;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber("chatdesk".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber).map_err(|err| Error::new(ErrorKind::Other, err))?;

    let settings = get_configuration().map_err(|err| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Failed to read configuration: {}", err),
        )
    })?;

    tracing::info!(
        db_host = %settings.database.host,
        db_port = settings.database.port,
        db_name = %settings.database.database_name,
        "Connecting to PostgreSQL"
    );

    let connect_options = PgConnectOptions::new()
        .host(&settings.database.host)
        .port(settings.database.port)
        .username(&settings.database.username)
        .password(&settings.database.password)
        .database(&settings.database.database_name)
        .ssl_mode(PgSslMode::Prefer);

    let pg_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(connect_options)
        .await
        .map_err(|err| {
            Error::new(
                ErrorKind::ConnectionRefused,
                format!("Failed to connect to database: {}", err),
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .map_err(|err| Error::new(ErrorKind::Other, format!("Migration failed: {}", err)))?;

    let address = format!("{}:{}", settings.app_host, settings.app_port);
    tracing::info!("Start server at {:?}", &address);
    let listener = TcpListener::bind(&address)?;

    run(listener, pg_pool, settings).await?.await
}
