use actix_web::dev::Server;
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::io;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, EmailClientSettings, Settings, StorageBackend};
use crate::email_client::{EmailClient, EmailProvider};
use crate::error::error_response;
use crate::notifications::{IntakeNotifier, NotificationDispatcher};
use crate::routes::{
    handle_list_subscriptions, handle_subscribe, handle_unsubscribe, health_check,
    INVALID_EMAIL_MESSAGE,
};
use crate::smtp_client::SmtpClient;
use crate::store::{InMemorySubscriptionStore, PostgresSubscriptionStore, SubscriptionStore};

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, io::Error> {
        let store: Arc<dyn SubscriptionStore> = match config.get_storage_backend() {
            StorageBackend::Postgres => Arc::new(PostgresSubscriptionStore::new(
                get_connection_db_pool(&config.database),
            )),
            StorageBackend::Memory => {
                tracing::warn!("Subscriptions are kept in memory and will be lost on restart");
                Arc::new(InMemorySubscriptionStore::new())
            }
        };
        let notifier = build_intake_notifier(&config.email_client)?;

        Self::build_with(&config, store, notifier)
    }

    /// Builds the application around an existing store and notifier.
    pub fn build_with(
        config: &Settings,
        store: Arc<dyn SubscriptionStore>,
        notifier: IntakeNotifier,
    ) -> Result<Self, io::Error> {
        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, store, notifier)?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), io::Error> {
        self.server.await
    }
}

/// Wires the configured email providers into an `IntakeNotifier`. A provider
/// whose credentials are missing is left out of the fallback chain.
pub fn build_intake_notifier(config: &EmailClientSettings) -> Result<IntakeNotifier, io::Error> {
    let admin_email = config.get_admin_email().map_err(invalid_config)?;
    let timeout = config.get_timeout();

    let primary: Option<Arc<dyn EmailProvider>> = match &config.primary {
        Some(settings) => match settings.get_api_key() {
            Some(api_key) => {
                let client = EmailClient::new(
                    settings.base_url.clone(),
                    settings.get_sender_email().map_err(invalid_config)?,
                    api_key,
                    Some(timeout),
                )
                .map_err(invalid_config)?;
                let client: Arc<dyn EmailProvider> = Arc::new(client);

                Some(client)
            }
            None => None,
        },
        None => None,
    };

    let secondary: Option<Arc<dyn EmailProvider>> = match &config.fallback {
        Some(settings) => match settings.get_credentials() {
            Some((username, app_password)) => {
                let client = SmtpClient::new(
                    &settings.host,
                    settings.port,
                    username,
                    app_password,
                    &settings.get_sender_email().map_err(invalid_config)?,
                    settings.require_tls,
                    Some(timeout),
                )
                .map_err(invalid_config)?;
                let client: Arc<dyn EmailProvider> = Arc::new(client);

                Some(client)
            }
            None => None,
        },
        None => None,
    };

    let dispatcher = NotificationDispatcher::new(primary, secondary);
    if !dispatcher.is_configured() {
        tracing::warn!("No email provider is configured, intake notifications will not be sent");
    }

    Ok(IntakeNotifier::new(dispatcher, admin_email))
}

fn invalid_config<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidInput, err)
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn SubscriptionStore>,
    notifier: IntakeNotifier,
) -> Result<Server, io::Error> {
    let store: web::Data<dyn SubscriptionStore> = web::Data::from(store);
    let notifier = web::Data::new(notifier);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .app_data(json_config())
            .app_data(query_config())
            .route("/health_check", web::get().to(health_check))
            .route("/subscribe", web::post().to(handle_subscribe))
            .route("/subscriptions", web::get().to(handle_list_subscriptions))
            .route("/unsubscribe", web::post().to(handle_unsubscribe))
            .app_data(store.clone())
            .app_data(notifier.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

// Malformed bodies get the same `{ "error" }` answer as a missing email.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _| {
        tracing::warn!("Rejected a malformed JSON body: {}", err);
        InternalError::from_response(
            err,
            error_response(StatusCode::BAD_REQUEST, INVALID_EMAIL_MESSAGE),
        )
        .into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _| {
        let message = format!("Invalid query parameters: {}", err);
        InternalError::from_response(err, error_response(StatusCode::BAD_REQUEST, &message))
            .into()
    })
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}
