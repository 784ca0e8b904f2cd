use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    new_subscription::NewSubscription,
    pagination::PageRequest,
    subscriber_email::SubscriberEmail,
    subscription::{IntakeOutcome, Subscription},
    subscription_status::SubscriptionStatus,
};
use crate::store::{empty_breakdown, StoreError, SubscriptionStore};

/// Subscriptions kept in process memory, keyed by normalized email.
///
/// Every write holds the lock for the whole check-then-write, which is what
/// keeps one record per address.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: RwLock<HashMap<String, Subscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record as-is, replacing any record with the same email.
    pub async fn insert(&self, subscription: Subscription) {
        self.subscriptions
            .write()
            .await
            .insert(subscription.email.as_ref().to_string(), subscription);
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    #[tracing::instrument(
        name = "Register a subscription in memory",
        skip(self, new_subscription),
        fields(subscriber_email = %new_subscription.email)
    )]
    async fn register(
        &self,
        new_subscription: &NewSubscription,
    ) -> Result<IntakeOutcome, StoreError> {
        let mut subscriptions = self.subscriptions.write().await;

        match subscriptions.get_mut(new_subscription.email.as_ref()) {
            Some(existing) if existing.status.is_active() => Ok(IntakeOutcome::AlreadyActive),
            Some(existing) => {
                existing.status = SubscriptionStatus::Active;
                existing.subscribed_at = Utc::now().max(existing.subscribed_at);

                Ok(IntakeOutcome::Reactivated(existing.clone()))
            }
            None => {
                let subscription = Subscription {
                    id: Uuid::new_v4(),
                    email: new_subscription.email.clone(),
                    status: SubscriptionStatus::Active,
                    subscribed_at: Utc::now(),
                    provenance: new_subscription.provenance.clone(),
                };
                subscriptions.insert(
                    new_subscription.email.as_ref().to_string(),
                    subscription.clone(),
                );

                Ok(IntakeOutcome::Created(subscription))
            }
        }
    }

    #[tracing::instrument(name = "Unsubscribe an address in memory", skip(self))]
    async fn unsubscribe(&self, email: &SubscriberEmail) -> Result<bool, StoreError> {
        let mut subscriptions = self.subscriptions.write().await;

        match subscriptions.get_mut(email.as_ref()) {
            Some(existing) if existing.status.is_active() => {
                existing.status = SubscriptionStatus::Unsubscribed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self.subscriptions.read().await.get(email.as_ref()).cloned())
    }

    async fn count_by_status(&self, status: SubscriptionStatus) -> Result<u64, StoreError> {
        let subscriptions = self.subscriptions.read().await;

        Ok(subscriptions
            .values()
            .filter(|subscription| subscription.status == status)
            .count() as u64)
    }

    async fn list(
        &self,
        status: SubscriptionStatus,
        page: &PageRequest,
    ) -> Result<Vec<Subscription>, StoreError> {
        let subscriptions = self.subscriptions.read().await;
        let mut matching: Vec<&Subscription> = subscriptions
            .values()
            .filter(|subscription| subscription.status == status)
            .collect();

        matching.sort_by(|a, b| b.subscribed_at.cmp(&a.subscribed_at));

        Ok(matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect())
    }

    async fn count_per_status(&self) -> Result<BTreeMap<SubscriptionStatus, u64>, StoreError> {
        let subscriptions = self.subscriptions.read().await;
        let mut breakdown = empty_breakdown();

        for subscription in subscriptions.values() {
            *breakdown.entry(subscription.status).or_insert(0) += 1;
        }

        Ok(breakdown)
    }
}
