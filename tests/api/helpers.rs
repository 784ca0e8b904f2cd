use chrono::{DateTime, Utc};
use reqwest::Response;
use secrecy::Secret;
use sqlx::{migrate, Connection, Executor, PgConnection, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;
use wiremock::MockServer;

use waitlist::{
    config::{get_configuration, DatabaseSettings, PrimaryProviderSettings, Settings},
    domain::{
        new_subscription::Provenance, subscriber_email::SubscriberEmail,
        subscription::Subscription, subscription_status::SubscriptionStatus,
    },
    notifications::DeliveryReport,
    startup::{build_intake_notifier, get_connection_db_pool, Application},
    store::{InMemorySubscriptionStore, SubscriptionStore},
};

pub const ADMIN_EMAIL: &str = "ops@ravoactive.com";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemorySubscriptionStore>,
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
    delivery_reports: Mutex<mpsc::UnboundedReceiver<DeliveryReport>>,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        Self::spawn_app_with(|_| {}).await
    }

    /// Spawns the application after `configure` had a chance to tweak the settings.
    pub async fn spawn_app_with(configure: impl FnOnce(&mut Settings)) -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let email_server = MockServer::start().await;

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.email_client.admin_email = String::from(ADMIN_EMAIL);
        config.email_client.timeout_milliseconds = 2000;
        config.email_client.primary = Some(PrimaryProviderSettings {
            base_url: email_server.uri(),
            sender_email: String::from("noreply@ravoactive.com"),
            api_key: Some(Secret::new(String::from("test-api-key"))),
        });
        // Tests opt in to the SMTP fallback explicitly.
        config.email_client.fallback = None;

        configure(&mut config);

        let store = Arc::new(InMemorySubscriptionStore::new());
        let (sender, receiver) = mpsc::unbounded_channel();
        let notifier = build_intake_notifier(&config.email_client)
            .expect("Failed to build the notifier.")
            .with_reports(sender);

        let application = Application::build_with(&config, store.clone(), notifier)
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            store,
            email_server,
            api_client: reqwest::Client::new(),
            delivery_reports: Mutex::new(receiver),
        }
    }

    pub async fn post_subscribe(&self, body: &serde_json::Value) -> Response {
        self.api_client
            .post(&format!("{}/subscribe", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_unsubscribe(&self, body: &serde_json::Value) -> Response {
        self.api_client
            .post(&format!("{}/unsubscribe", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_subscriptions(&self, query: &str) -> Response {
        self.api_client
            .get(&format!("{}/subscriptions{}", self.address, query))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Waits for the background notifications of the next accepted intake.
    pub async fn next_delivery_report(&self) -> DeliveryReport {
        let mut reports = self.delivery_reports.lock().await;

        tokio::time::timeout(Duration::from_secs(10), reports.recv())
            .await
            .expect("No delivery report within 10 seconds.")
            .expect("The delivery report channel was closed.")
    }

    pub async fn seed(
        &self,
        email: &str,
        status: SubscriptionStatus,
        subscribed_at: DateTime<Utc>,
    ) -> Subscription {
        let subscription = Subscription {
            id: Uuid::new_v4(),
            email: SubscriberEmail::parse(email.to_string()).unwrap(),
            status,
            subscribed_at,
            provenance: Provenance::new(None, None, Some(String::from("seed"))),
        };
        self.store.insert(subscription.clone()).await;

        subscription
    }

    pub async fn find(&self, email: &str) -> Option<Subscription> {
        self.store
            .find_by_email(&SubscriberEmail::parse(email.to_string()).unwrap())
            .await
            .expect("Failed to read the store.")
    }

    pub async fn count(&self, status: SubscriptionStatus) -> u64 {
        self.store
            .count_by_status(status)
            .await
            .expect("Failed to read the store.")
    }
}

/// Creates a fresh, migrated database on the configured Postgres server.
pub async fn configure_db(db_config: &mut DatabaseSettings) -> PgPool {
    let db_test_name = format!("db_{}", Uuid::new_v4().to_string().replace('-', "_"));

    // Create database
    let mut connection = PgConnection::connect_with(&db_config.get_server_options())
        .await
        .expect("Failed to connect to Postgres.");

    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, db_test_name))
        .await
        .expect("Failed to create database.");

    connection
        .close()
        .await
        .expect("Failed to close connection.");

    // Execute migrations
    db_config.set_name(db_test_name.clone());

    let db_pool = get_connection_db_pool(db_config);

    migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations.");

    println!("Database {} created!!", db_config.get_name());

    db_pool
}
