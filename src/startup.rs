use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{Argon2Hasher, HashParams, JwtTokenService, PasswordHasher, TokenService};
use crate::configuration::JwtSettings;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::revocation::{InMemoryRevocationStore, RevocationStore};
use crate::routes::{create_saving, health_check, list_savings, login, logout, ping, refresh, register};
use crate::savings::{InMemorySavingsRepository, SavingsRepository};
use crate::uploads::{UploadStore, PUBLIC_PREFIX};
use crate::users::{InMemoryUserDirectory, UserDirectory};

/// Collaborators shared by every worker
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<dyn UserDirectory>,
    pub savings: Arc<dyn SavingsRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub uploads: UploadStore,
}

impl AppServices {
    /// Process-local wiring with no Postgres or Redis behind it
    pub fn in_memory(jwt: &JwtSettings, hashing: HashParams, uploads: UploadStore) -> Self {
        let store: Arc<dyn RevocationStore> = Arc::new(InMemoryRevocationStore::new());

        Self {
            users: Arc::new(InMemoryUserDirectory::new()),
            savings: Arc::new(InMemorySavingsRepository::new()),
            tokens: Arc::new(JwtTokenService::new(jwt, store)),
            hasher: Arc::new(Argon2Hasher::new(hashing)),
            uploads,
        }
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        tracing::warn!(error = %err, "Rejected JSON body");
        AppError::Validation(ValidationError::InvalidFormat("body".to_string())).into()
    })
}

pub fn run(listener: TcpListener, services: AppServices) -> Result<Server, std::io::Error> {
    let users = web::Data::from(services.users.clone());
    let savings = web::Data::from(services.savings.clone());
    let tokens = web::Data::from(services.tokens.clone());
    let hasher = web::Data::from(services.hasher.clone());
    let uploads = web::Data::new(services.uploads.clone());
    let upload_dir = services.uploads.directory().to_path_buf();

    let server = HttpServer::new(move || {
        let gate = || JwtMiddleware::new(services.tokens.clone(), services.users.clone());

        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(json_config())
            .app_data(users.clone())
            .app_data(savings.clone())
            .app_data(tokens.clone())
            .app_data(hasher.clone())
            .app_data(uploads.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .route("/ping", web::get().to(ping))
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/refresh", web::post().to(refresh))
                            .service(
                                web::resource("/logout")
                                    .route(web::post().to(logout))
                                    .wrap(gate()),
                            ),
                    )
                    // Protected routes (require JWT authentication)
                    .service(
                        web::resource("/savings")
                            .route(web::get().to(list_savings))
                            .route(web::post().to(create_saving))
                            .wrap(gate()),
                    ),
            )
            .service(fs::Files::new(PUBLIC_PREFIX, upload_dir.clone()))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
