use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::{
    error::{error_chain_fmt, error_response},
    routes::subscribe::{parse_email, INVALID_EMAIL_MESSAGE},
    store::{StoreError, SubscriptionStore},
};

#[derive(Deserialize)]
pub struct UnsubscribeBody {
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct UnsubscribeResponse {
    success: bool,
    message: &'static str,
}

#[derive(thiserror::Error)]
pub enum UnsubscribeError {
    #[error("{}", INVALID_EMAIL_MESSAGE)]
    ValidationError(String),
    #[error("This email is not subscribed to the waitlist.")]
    NotSubscribed,
    #[error("Failed to update the subscription.")]
    PersistenceError(#[from] StoreError),
}

impl std::fmt::Debug for UnsubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for UnsubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            UnsubscribeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            UnsubscribeError::NotSubscribed => StatusCode::NOT_FOUND,
            UnsubscribeError::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            UnsubscribeError::PersistenceError(_) => error_response(
                self.status_code(),
                "Something went wrong. Please try again.",
            ),
            _ => error_response(self.status_code(), &self.to_string()),
        }
    }
}

#[tracing::instrument(name = "Removing an email from the waitlist", skip(body, store))]
pub async fn handle_unsubscribe(
    body: web::Json<UnsubscribeBody>,
    store: web::Data<dyn SubscriptionStore>,
) -> Result<HttpResponse, UnsubscribeError> {
    let email = parse_email(body.into_inner().email).map_err(UnsubscribeError::ValidationError)?;

    if !store.unsubscribe(&email).await? {
        return Err(UnsubscribeError::NotSubscribed);
    }

    tracing::info!(subscriber_email = %email, "Subscription deactivated");

    Ok(HttpResponse::Ok().json(UnsubscribeResponse {
        success: true,
        message: "You have been unsubscribed from the waitlist.",
    }))
}
