use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::{EmailMessage, EmailProvider};
use crate::email_templates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { provider: &'static str },
    Failed,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Delivers an email through the primary provider, falling back once to the
/// secondary one. Failures are logged and reported through the returned
/// outcome, never raised.
pub struct NotificationDispatcher {
    primary: Option<Arc<dyn EmailProvider>>,
    secondary: Option<Arc<dyn EmailProvider>>,
}

impl NotificationDispatcher {
    pub fn new(
        primary: Option<Arc<dyn EmailProvider>>,
        secondary: Option<Arc<dyn EmailProvider>>,
    ) -> Self {
        Self { primary, secondary }
    }

    pub fn is_configured(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    #[tracing::instrument(
        name = "Dispatch an email",
        skip(self, message),
        fields(recipient = %message.recipient, subject = %message.subject)
    )]
    pub async fn send(&self, message: &EmailMessage) -> DeliveryOutcome {
        if !self.is_configured() {
            tracing::warn!("No email provider is configured, the email is dropped");
            return DeliveryOutcome::Failed;
        }

        for provider in self.primary.iter().chain(self.secondary.iter()) {
            match provider.send(message).await {
                Ok(()) => {
                    tracing::info!(provider = provider.name(), "Email delivered");
                    return DeliveryOutcome::Delivered {
                        provider: provider.name(),
                    };
                }
                Err(err) => {
                    tracing::error!(
                        provider = provider.name(),
                        "Failed to deliver the email: {:?}",
                        err
                    );
                }
            }
        }

        DeliveryOutcome::Failed
    }
}

/// What an accepted intake needs to announce.
#[derive(Debug, Clone)]
pub struct IntakeNotice {
    pub subscriber: SubscriberEmail,
    pub subscribed_at: DateTime<Utc>,
    pub reactivated: bool,
    pub total_active: u64,
}

/// Outcome of the two emails sent for an intake.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub subscriber: SubscriberEmail,
    pub admin_alert: DeliveryOutcome,
    pub welcome: DeliveryOutcome,
}

/// Sends the admin alert and the welcome email of an intake in a detached
/// task, so the request never waits on email delivery.
pub struct IntakeNotifier {
    dispatcher: Arc<NotificationDispatcher>,
    admin_email: SubscriberEmail,
    reports: Option<UnboundedSender<DeliveryReport>>,
}

impl IntakeNotifier {
    pub fn new(dispatcher: NotificationDispatcher, admin_email: SubscriberEmail) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            admin_email,
            reports: None,
        }
    }

    /// Publishes a `DeliveryReport` on `reports` once both sends are done.
    pub fn with_reports(mut self, reports: UnboundedSender<DeliveryReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn notify(&self, notice: IntakeNotice) {
        let dispatcher = self.dispatcher.clone();
        let reports = self.reports.clone();
        let admin_alert = email_templates::admin_alert(
            &self.admin_email,
            &notice.subscriber,
            notice.subscribed_at,
            notice.reactivated,
            notice.total_active,
        );
        let welcome = email_templates::welcome(&notice.subscriber);
        let span = tracing::info_span!(
            "Send intake notifications",
            subscriber_email = %notice.subscriber
        );

        tokio::spawn(
            async move {
                let (admin_alert, welcome) = tokio::join!(
                    deliver(&dispatcher, admin_alert),
                    deliver(&dispatcher, welcome)
                );
                let report = DeliveryReport {
                    subscriber: notice.subscriber,
                    admin_alert,
                    welcome,
                };

                if report.admin_alert.is_delivered() && report.welcome.is_delivered() {
                    tracing::info!("Intake notifications delivered");
                } else {
                    tracing::warn!(
                        admin_alert = ?report.admin_alert,
                        welcome = ?report.welcome,
                        "Some intake notifications were not delivered"
                    );
                }

                if let Some(reports) = reports {
                    // Nobody listening any more is not an error.
                    let _ = reports.send(report);
                }
            }
            .instrument(span),
        );
    }
}

async fn deliver(
    dispatcher: &NotificationDispatcher,
    message: Result<EmailMessage, askama::Error>,
) -> DeliveryOutcome {
    match message {
        Ok(message) => dispatcher.send(&message).await,
        Err(err) => {
            tracing::error!("Failed to render the email: {:?}", err);
            DeliveryOutcome::Failed
        }
    }
}
