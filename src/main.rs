use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use tabungan::auth::{Argon2Hasher, HashParams, JwtTokenService};
use tabungan::configuration::get_configuration;
use tabungan::revocation::RedisRevocationStore;
use tabungan::savings::PgSavingsRepository;
use tabungan::startup::{run, AppServices};
use tabungan::telemetry::init_telemetry;
use tabungan::uploads::UploadStore;
use tabungan::users::PgUserDirectory;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;
    tracing::info!("Database connection pool created successfully");

    let revocation_store = RedisRevocationStore::connect(&configuration.redis)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to Redis: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Redis connection error")
        })?;

    let uploads = UploadStore::from(&configuration.uploads);
    std::fs::create_dir_all(uploads.directory())?;

    let services = AppServices {
        users: Arc::new(PgUserDirectory::new(pool.clone())),
        savings: Arc::new(PgSavingsRepository::new(pool)),
        tokens: Arc::new(JwtTokenService::new(&configuration.jwt, Arc::new(revocation_store))),
        hasher: Arc::new(Argon2Hasher::new(HashParams::from(&configuration.hashing))),
        uploads,
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, services)?;
    tracing::info!("Server started successfully");

    server.await
}
