//! Subjects and bodies of the emails sent after an intake.

use askama::Template;
use chrono::{DateTime, Utc};

use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::EmailMessage;

const BRAND: &str = "RavoActive";
const TAGLINE: &str = "Premium activewear for athletes who demand excellence";

/// HTML body of the admin alert.
#[derive(Template)]
#[template(path = "admin_alert.html")]
struct AdminAlertHtml<'a> {
    kind: &'a str,
    brand: &'a str,
    tagline: &'a str,
    subscriber: &'a SubscriberEmail,
    timestamp: &'a str,
    total_active: u64,
}

/// HTML body of the welcome email.
#[derive(Template)]
#[template(path = "welcome.html")]
struct WelcomeHtml<'a> {
    brand: &'a str,
    tagline: &'a str,
    subscriber: &'a SubscriberEmail,
}

/// Alert sent to the operations mailbox for every accepted intake.
pub fn admin_alert(
    admin_email: &SubscriberEmail,
    subscriber: &SubscriberEmail,
    subscribed_at: DateTime<Utc>,
    reactivated: bool,
    total_active: u64,
) -> Result<EmailMessage, askama::Error> {
    let timestamp = subscribed_at
        .format("%B %-d, %Y at %H:%M:%S UTC")
        .to_string();
    let kind = if reactivated {
        "A former subscriber rejoined"
    } else {
        "A new subscriber joined"
    };

    let html_body = AdminAlertHtml {
        kind,
        brand: BRAND,
        tagline: TAGLINE,
        subscriber,
        timestamp: &timestamp,
        total_active,
    }
    .render()?;

    let text_body = format!(
        "NEW {brand} WAITLIST SUBSCRIPTION\n\n\
         {kind} the waitlist.\n\n\
         Subscriber: {subscriber}\n\
         Subscribed on: {timestamp}\n\
         Active subscribers: {total_active}\n\n\
         ---\n\
         {brand} - {tagline}\n",
        brand = BRAND,
        kind = kind,
        subscriber = subscriber,
        timestamp = timestamp,
        total_active = total_active,
        tagline = TAGLINE,
    );

    Ok(EmailMessage {
        recipient: admin_email.clone(),
        subject: format!("New {} waitlist subscription", BRAND),
        html_body,
        text_body,
    })
}

/// Welcome message sent to the subscriber.
pub fn welcome(subscriber: &SubscriberEmail) -> Result<EmailMessage, askama::Error> {
    let html_body = WelcomeHtml {
        brand: BRAND,
        tagline: TAGLINE,
        subscriber,
    }
    .render()?;

    let text_body = format!(
        "WELCOME TO {brand}!\n\n\
         Thanks for joining our exclusive waitlist!\n\n\
         What you can expect:\n\
         - Early Access: be the first to shop our collection\n\
         - Exclusive Discounts: special launch pricing just for you\n\
         - Insider Updates: behind-the-scenes content and launch news\n\
         - VIP Treatment: priority customer support and perks\n\n\
         Questions? Reply to this email, we'd love to hear from you!\n\n\
         ---\n\
         {brand}\n\
         {tagline}\n\n\
         You received this email because {subscriber} subscribed to our waitlist.\n",
        brand = BRAND,
        tagline = TAGLINE,
        subscriber = subscriber,
    );

    Ok(EmailMessage {
        recipient: subscriber.clone(),
        subject: format!("Welcome to {} - You're In!", BRAND),
        html_body,
        text_body,
    })
}
