use actix_web::dev::Server;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, App, HttpRequest, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, TokenIssuer};
use crate::configuration::{AdminSettings, DatabaseSettings, Settings, StorageBackend};
use crate::error::{AppError, StorageError, ValidationError};
use crate::logger::{request_id, LoggerMiddleware};
use crate::middleware::JwtMiddleware;
use crate::routes::{health_check, login, logout, profile, refresh};
use crate::store::{
    InMemorySessionStore, InMemoryUserStore, PgSessionStore, PgUserStore, SessionStore, UserStore,
};
use crate::validators::{is_valid_email, is_valid_username};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    /// Wire every component from settings. Misconfiguration (missing or
    /// identical secrets, bad TTLs) fails here, before the listener binds.
    pub async fn build(settings: Settings) -> Result<Self, AppError> {
        let issuer = Arc::new(TokenIssuer::from_settings(&settings.jwt)?);
        tracing::info!(
            access_ttl = %settings.jwt.access_token_ttl,
            refresh_ttl = %settings.jwt.refresh_token_ttl,
            "Token issuer configured"
        );

        let (users, sessions) = build_stores(&settings).await?;
        let auth = AuthService::new(issuer, users, sessions, &settings.security);

        if let Some(admin) = &settings.admin {
            ensure_admin(&auth, admin).await?;
        }

        let address = format!("{}:{}", settings.application.host, settings.application.port);
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();
        tracing::info!("Server listening on: {}:{}", settings.application.host, port);

        let server = run(listener, web::Data::new(auth))?;
        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

async fn build_stores(
    settings: &Settings,
) -> Result<(Arc<dyn UserStore>, Arc<dyn SessionStore>), AppError> {
    match settings.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; sessions are lost on restart");
            Ok((
                Arc::new(InMemoryUserStore::new()),
                Arc::new(InMemorySessionStore::new()),
            ))
        }
        StorageBackend::Postgres => {
            let pool = get_connection_pool(&settings.database);
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");
            Ok((
                Arc::new(PgUserStore::new(pool.clone())),
                Arc::new(PgSessionStore::new(pool)),
            ))
        }
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(configuration.acquire_timeout())
        .connect_lazy_with(configuration.with_db())
}

/// Create the bootstrap account unless a user with that username exists.
pub async fn ensure_admin(auth: &AuthService, admin: &AdminSettings) -> Result<(), AppError> {
    let username = is_valid_username(&admin.username)?;
    let email = is_valid_email(&admin.email)?;

    if auth.user_exists(&username).await? {
        tracing::debug!(username = %username, "Bootstrap account already present");
        return Ok(());
    }

    match auth
        .register_user(&username, &email, &admin.password, admin.role)
        .await
    {
        Ok(_) => Ok(()),
        // Another instance created it between our check and insert
        Err(AppError::Storage(StorageError::Conflict(_))) => Ok(()),
        Err(e) => Err(e),
    }
}

fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    let response = AppError::Validation(ValidationError::InvalidFormat(format!(
        "Invalid request body: {}",
        err
    )))
    .to_http_response(&request_id(req));
    InternalError::from_response(err, response).into()
}

pub fn run(listener: TcpListener, auth: web::Data<AuthService>) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        let issuer = auth.issuer().clone();

        App::new()
            .wrap(LoggerMiddleware)
            .app_data(auth.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1/auth")
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .service(
                        web::resource("/logout")
                            .wrap(JwtMiddleware::new(issuer.clone()))
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/profile")
                            .wrap(JwtMiddleware::new(issuer))
                            .route(web::get().to(profile)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
