pub mod config;
pub mod domain;
pub mod email_client;
pub mod email_templates;
pub mod error;
pub mod notifications;
pub mod routes;
pub mod smtp_client;
pub mod startup;
pub mod store;
pub mod telemetry;
