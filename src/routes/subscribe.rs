use actix_web::{http::header, http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        new_subscription::{NewSubscription, Provenance},
        subscriber_email::SubscriberEmail,
        subscription::IntakeOutcome,
        subscription_status::SubscriptionStatus,
    },
    error::{error_chain_fmt, error_response},
    notifications::{IntakeNotice, IntakeNotifier},
    store::{StoreError, SubscriptionStore},
};

pub const INVALID_EMAIL_MESSAGE: &str = "Please provide a valid email address";

#[derive(Deserialize)]
pub struct SubscribeBody {
    pub email: Option<String>,
    pub source: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    success: bool,
    message: &'static str,
    total_subscriptions: u64,
    reactivated: bool,
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{}", INVALID_EMAIL_MESSAGE)]
    ValidationError(String),
    #[error("This email is already on the waitlist.")]
    DuplicateSubscriptionError,
    #[error("Failed to persist the subscription.")]
    PersistenceError(#[from] StoreError),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscribeError::DuplicateSubscriptionError => StatusCode::BAD_REQUEST,
            SubscribeError::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            SubscribeError::PersistenceError(_) => error_response(
                self.status_code(),
                "Something went wrong. Please try again.",
            ),
            _ => error_response(self.status_code(), &self.to_string()),
        }
    }
}

#[tracing::instrument(
    name = "Adding an email to the waitlist",
    skip(request, body, store, notifier),
    fields(
        subscriber_email = tracing::field::Empty,
        source = ?body.source
    )
)]
pub async fn handle_subscribe(
    request: HttpRequest,
    body: web::Json<SubscribeBody>,
    store: web::Data<dyn SubscriptionStore>,
    notifier: web::Data<IntakeNotifier>,
) -> Result<HttpResponse, SubscribeError> {
    let body = body.into_inner();
    let email = parse_email(body.email).map_err(SubscribeError::ValidationError)?;

    tracing::Span::current().record("subscriber_email", tracing::field::display(&email));

    let new_subscription = NewSubscription {
        email,
        provenance: request_provenance(&request, body.source),
    };

    let (subscription, reactivated) = match store.register(&new_subscription).await? {
        IntakeOutcome::Created(subscription) => (subscription, false),
        IntakeOutcome::Reactivated(subscription) => (subscription, true),
        IntakeOutcome::AlreadyActive => {
            tracing::info!("The email is already an active subscriber");
            return Err(SubscribeError::DuplicateSubscriptionError);
        }
    };

    // The count only feeds reporting, failing to read it must not fail an intake that was stored.
    let total_active = match store.count_by_status(SubscriptionStatus::Active).await {
        Ok(total_active) => total_active,
        Err(err) => {
            tracing::error!("Failed to count active subscriptions: {:?}", err);
            0
        }
    };

    notifier.notify(IntakeNotice {
        subscriber: subscription.email,
        subscribed_at: subscription.subscribed_at,
        reactivated,
        total_active,
    });

    let message = if reactivated {
        "Welcome back! Your subscription has been reactivated."
    } else {
        "Thank you for subscribing! Check your email for confirmation."
    };

    Ok(HttpResponse::Ok().json(SubscribeResponse {
        success: true,
        message,
        total_subscriptions: total_active,
        reactivated,
    }))
}

/// Validates and normalizes the email field of a request body.
pub fn parse_email(email: Option<String>) -> Result<SubscriberEmail, String> {
    match email {
        Some(email) => SubscriberEmail::parse(email),
        None => Err(String::from("The email field is missing")),
    }
}

fn request_provenance(request: &HttpRequest, source: Option<String>) -> Provenance {
    // The first X-Forwarded-For entry is the client when running behind a proxy.
    let ip_address = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .or_else(|| request.peer_addr().map(|addr| addr.ip().to_string()));
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    Provenance::new(ip_address, user_agent, source)
}
