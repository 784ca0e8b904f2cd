use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// A single email, always carrying both an HTML and a plain-text rendition.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub recipient: SubscriberEmail,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(thiserror::Error, Debug)]
pub enum NotificationDeliveryError {
    #[error("The email API did not accept the message.")]
    Api(#[from] reqwest::Error),
    #[error("The SMTP server did not accept the message.")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Failed to build the email message.")]
    Message(#[from] lettre::error::Error),
    #[error("Invalid mailbox: {0}")]
    Address(#[from] lettre::address::AddressError),
}

/// An external service able to deliver an email.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Short name used in logs and delivery reports.
    fn name(&self) -> &'static str;

    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationDeliveryError>;
}

/// Client for a SendGrid-compatible transactional email API.
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SubscriberEmail,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
pub struct SendEmailBody {
    personalizations: Vec<SengridPersonalization>,
    from: SengridEmail,
    subject: String,
    content: Vec<SengridContent>,
}

#[derive(serde::Serialize)]
struct SengridEmail {
    email: String,
}

#[derive(serde::Serialize)]
struct SengridPersonalization {
    to: Vec<SengridEmail>,
}

#[derive(serde::Serialize)]
struct SengridContent {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SubscriberEmail,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<EmailClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(EmailClient {
            http_client,
            base_url,
            sender,
            api_key,
        })
    }

    pub async fn send_email(
        &self,
        recipent: &SubscriberEmail,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/mail/send", self.base_url);
        let body = SendEmailBody {
            from: SengridEmail {
                email: String::from(self.sender.as_ref()),
            },
            personalizations: vec![SengridPersonalization {
                to: vec![SengridEmail {
                    email: String::from(recipent.as_ref()),
                }],
            }],
            subject: String::from(subject),
            // The API expects the plain-text part before the HTML one.
            content: vec![
                SengridContent {
                    content_type: String::from("text/plain"),
                    value: String::from(text_content),
                },
                SengridContent {
                    content_type: String::from("text/html"),
                    value: String::from(html_content),
                },
            ],
        };

        self.http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}

#[async_trait]
impl EmailProvider for EmailClient {
    fn name(&self) -> &'static str {
        "sendgrid"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationDeliveryError> {
        self.send_email(
            &message.recipient,
            &message.subject,
            &message.html_body,
            &message.text_body,
        )
        .await?;

        Ok(())
    }
}
