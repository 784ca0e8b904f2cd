use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::{
    new_subscription::NewSubscription,
    pagination::PageRequest,
    subscriber_email::SubscriberEmail,
    subscription::{IntakeOutcome, Subscription},
    subscription_status::SubscriptionStatus,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemorySubscriptionStore;
pub use postgres::PostgresSubscriptionStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Failed to execute a query against the subscriptions table.")]
    Database(#[from] sqlx::Error),
}

/// Persistence for subscriptions.
///
/// Implementations own the uniqueness of the normalized email: `register`
/// must be atomic, so concurrent intakes of one address create a single record.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Creates a record, reactivates an unsubscribed one, or reports that the
    /// address is already active without writing anything.
    async fn register(&self, new_subscription: &NewSubscription)
        -> Result<IntakeOutcome, StoreError>;

    /// Flips an active record to unsubscribed. Returns `false` when there was
    /// no active record for the address.
    async fn unsubscribe(&self, email: &SubscriberEmail) -> Result<bool, StoreError>;

    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscription>, StoreError>;

    async fn count_by_status(&self, status: SubscriptionStatus) -> Result<u64, StoreError>;

    /// One page of records with `status`, newest activation first.
    async fn list(
        &self,
        status: SubscriptionStatus,
        page: &PageRequest,
    ) -> Result<Vec<Subscription>, StoreError>;

    /// Number of records per status across the whole collection, statuses
    /// without records are reported as zero.
    async fn count_per_status(&self) -> Result<BTreeMap<SubscriptionStatus, u64>, StoreError>;
}

pub(crate) fn empty_breakdown() -> BTreeMap<SubscriptionStatus, u64> {
    SubscriptionStatus::ALL
        .into_iter()
        .map(|status| (status, 0))
        .collect()
}
