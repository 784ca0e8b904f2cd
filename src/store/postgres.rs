use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    new_subscription::{NewSubscription, Provenance},
    pagination::PageRequest,
    subscriber_email::SubscriberEmail,
    subscription::{IntakeOutcome, Subscription},
    subscription_status::SubscriptionStatus,
};
use crate::store::{empty_breakdown, StoreError, SubscriptionStore};

const SUBSCRIPTION_COLUMNS: &str =
    "id, email, status, subscribed_at, ip_address, user_agent, source";

pub struct PostgresSubscriptionStore {
    db_pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    #[tracing::instrument(
        name = "Register a subscription in the database",
        skip(self, new_subscription),
        fields(subscriber_email = %new_subscription.email)
    )]
    async fn register(
        &self,
        new_subscription: &NewSubscription,
    ) -> Result<IntakeOutcome, StoreError> {
        let mut transaction = self.db_pool.begin().await?;

        // The row lock serializes a reactivation against a concurrent one.
        let existing = sqlx::query("SELECT status FROM subscriptions WHERE email = $1 FOR UPDATE")
            .bind(new_subscription.email.as_ref())
            .try_map(|row: PgRow| parse_status(row.try_get("status")?))
            .fetch_optional(&mut transaction)
            .await?;

        let outcome = match existing {
            Some(SubscriptionStatus::Active) => IntakeOutcome::AlreadyActive,
            Some(SubscriptionStatus::Unsubscribed) => {
                let subscription = sqlx::query(&format!(
                    r#"
                    UPDATE subscriptions
                    SET status = 'ACTIVE', subscribed_at = GREATEST(subscribed_at, $2)
                    WHERE email = $1
                    RETURNING {}
                    "#,
                    SUBSCRIPTION_COLUMNS
                ))
                .bind(new_subscription.email.as_ref())
                .bind(Utc::now())
                .try_map(subscription_from_row)
                .fetch_one(&mut transaction)
                .await?;

                IntakeOutcome::Reactivated(subscription)
            }
            None => {
                // A concurrent insert of the same address wins the unique constraint,
                // the loser gets no row back and reports a duplicate.
                let created = sqlx::query(&format!(
                    r#"
                    INSERT INTO subscriptions ({})
                    VALUES ($1, $2, 'ACTIVE', $3, $4, $5, $6)
                    ON CONFLICT (email) DO NOTHING
                    RETURNING {}
                    "#,
                    SUBSCRIPTION_COLUMNS, SUBSCRIPTION_COLUMNS
                ))
                .bind(Uuid::new_v4())
                .bind(new_subscription.email.as_ref())
                .bind(Utc::now())
                .bind(&new_subscription.provenance.ip_address)
                .bind(&new_subscription.provenance.user_agent)
                .bind(&new_subscription.provenance.source)
                .try_map(subscription_from_row)
                .fetch_optional(&mut transaction)
                .await?;

                match created {
                    Some(subscription) => IntakeOutcome::Created(subscription),
                    None => IntakeOutcome::AlreadyActive,
                }
            }
        };

        transaction.commit().await?;

        Ok(outcome)
    }

    #[tracing::instrument(
        name = "Unsubscribe an address in the database",
        skip(self),
        fields(subscriber_email = %email)
    )]
    async fn unsubscribe(&self, email: &SubscriberEmail) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'UNSUBSCRIBED'
            WHERE email = $1 AND status = 'ACTIVE'
            "#,
        )
        .bind(email.as_ref())
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Find a subscription by email", skip(self))]
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscription>, StoreError> {
        let subscription = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE email = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(email.as_ref())
        .try_map(subscription_from_row)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(subscription)
    }

    #[tracing::instrument(name = "Count subscriptions with a status", skip(self))]
    async fn count_by_status(&self, status: SubscriptionStatus) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM subscriptions WHERE status = $1")
            .bind(status.as_ref())
            .try_map(|row: PgRow| row.try_get("count"))
            .fetch_one(&self.db_pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    #[tracing::instrument(name = "List a page of subscriptions", skip(self))]
    async fn list(
        &self,
        status: SubscriptionStatus,
        page: &PageRequest,
    ) -> Result<Vec<Subscription>, StoreError> {
        let subscriptions = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM subscriptions
            WHERE status = $1
            ORDER BY subscribed_at DESC
            LIMIT $2 OFFSET $3
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(status.as_ref())
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .try_map(subscription_from_row)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(subscriptions)
    }

    #[tracing::instrument(name = "Count subscriptions per status", skip(self))]
    async fn count_per_status(&self) -> Result<BTreeMap<SubscriptionStatus, u64>, StoreError> {
        let counts = sqlx::query("SELECT status, COUNT(*) AS count FROM subscriptions GROUP BY status")
            .try_map(|row: PgRow| {
                let status = parse_status(row.try_get("status")?)?;
                let count: i64 = row.try_get("count")?;

                Ok((status, count.max(0) as u64))
            })
            .fetch_all(&self.db_pool)
            .await?;

        let mut breakdown = empty_breakdown();
        breakdown.extend(counts);

        Ok(breakdown)
    }
}

fn subscription_from_row(row: PgRow) -> Result<Subscription, sqlx::Error> {
    Ok(Subscription {
        id: row.try_get("id")?,
        email: SubscriberEmail::parse(row.try_get("email")?).map_err(decode_error)?,
        status: parse_status(row.try_get("status")?)?,
        subscribed_at: row.try_get("subscribed_at")?,
        provenance: Provenance {
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
            source: row.try_get("source")?,
        },
    })
}

fn parse_status(status: String) -> Result<SubscriptionStatus, sqlx::Error> {
    SubscriptionStatus::parse(status).map_err(decode_error)
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}
