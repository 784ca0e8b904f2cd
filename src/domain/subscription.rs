use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::new_subscription::Provenance;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscription_status::SubscriptionStatus;

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub status: SubscriptionStatus,
    /// Time of the latest activation, refreshed on reactivation.
    pub subscribed_at: DateTime<Utc>,
    pub provenance: Provenance,
}

/// What an intake did to the stored record.
#[derive(Debug, Clone)]
pub enum IntakeOutcome {
    Created(Subscription),
    Reactivated(Subscription),
    AlreadyActive,
}

/// The fields of a subscription exposed by the listing endpoint.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub subscribed_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub source: String,
}

impl From<Subscription> for SubscriptionSummary {
    fn from(subscription: Subscription) -> Self {
        SubscriptionSummary {
            id: subscription.id,
            email: subscription.email,
            subscribed_at: subscription.subscribed_at,
            status: subscription.status,
            source: subscription.provenance.source,
        }
    }
}
