use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::{EmailMessage, EmailProvider, NotificationDeliveryError};

const SMTP_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// Sends email through an SMTP relay authenticated with a username and an
/// app password (e.g. a Gmail account).
pub struct SmtpClient {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpClient {
    /// Builds the pooled transport, which spawns its pool on the current Tokio
    /// runtime: call it from within one.
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        app_password: Secret<String>,
        sender: &SubscriberEmail,
        require_tls: bool,
        timeout: Option<time::Duration>,
    ) -> Result<SmtpClient, NotificationDeliveryError> {
        let builder = if require_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            // Plain connections are only meant for local relays and tests.
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        let credentials = Credentials::new(username, app_password.expose_secret().clone());
        let mailer = builder
            .port(port)
            .credentials(credentials)
            .timeout(Some(timeout.unwrap_or(SMTP_TIMEOUT)))
            .build();

        Ok(SmtpClient {
            mailer,
            sender: sender.as_ref().parse()?,
        })
    }
}

fn build_message(
    sender: &Mailbox,
    message: &EmailMessage,
) -> Result<Message, NotificationDeliveryError> {
    let email = Message::builder()
        .from(sender.clone())
        .to(message.recipient.as_ref().parse()?)
        .subject(message.subject.as_str())
        .multipart(MultiPart::alternative_plain_html(
            message.text_body.clone(),
            message.html_body.clone(),
        ))?;

    Ok(email)
}

#[async_trait]
impl EmailProvider for SmtpClient {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationDeliveryError> {
        let email = build_message(&self.sender, message)?;
        self.mailer.send(email).await?;

        Ok(())
    }
}
