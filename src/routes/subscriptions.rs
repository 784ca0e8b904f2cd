use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    domain::{
        pagination::{PageRequest, Pagination},
        subscription::SubscriptionSummary,
        subscription_status::SubscriptionStatus,
    },
    error::{error_chain_fmt, error_response},
    store::{StoreError, SubscriptionStore},
};

#[derive(Deserialize, Debug)]
pub struct ListingParameters {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct SubscriptionsPage {
    pub subscriptions: Vec<SubscriptionSummary>,
    pub pagination: Pagination,
    pub analytics: BTreeMap<SubscriptionStatus, u64>,
}

#[derive(thiserror::Error)]
pub enum ListSubscriptionsError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Failed to fetch subscriptions")]
    QueryError(#[from] StoreError),
}

impl std::fmt::Debug for ListSubscriptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ListSubscriptionsError {
    fn status_code(&self) -> StatusCode {
        match self {
            ListSubscriptionsError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ListSubscriptionsError::QueryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), &self.to_string())
    }
}

#[tracing::instrument(name = "Listing waitlist subscriptions", skip(store))]
pub async fn handle_list_subscriptions(
    parameters: web::Query<ListingParameters>,
    store: web::Data<dyn SubscriptionStore>,
) -> Result<HttpResponse, ListSubscriptionsError> {
    let parameters = parameters.into_inner();
    let page = PageRequest::parse(parameters.page, parameters.limit)
        .map_err(ListSubscriptionsError::ValidationError)?;
    let status = match parameters.status {
        Some(status) => {
            SubscriptionStatus::parse(status).map_err(ListSubscriptionsError::ValidationError)?
        }
        None => SubscriptionStatus::default(),
    };

    let subscriptions = store.list(status, &page).await?;
    let total_count = store.count_by_status(status).await?;
    let analytics = store.count_per_status().await?;

    Ok(HttpResponse::Ok().json(SubscriptionsPage {
        subscriptions: subscriptions
            .into_iter()
            .map(SubscriptionSummary::from)
            .collect(),
        pagination: Pagination::new(&page, total_count),
        analytics,
    }))
}
