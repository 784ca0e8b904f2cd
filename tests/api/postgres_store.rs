//! Store tests against a real Postgres server. Run them with
//! `cargo test -- --ignored` once the database from `config/` is up.

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use sqlx::{postgres::PgRow, Row};

use crate::helpers::configure_db;
use waitlist::config::get_configuration;
use waitlist::domain::{
    new_subscription::{NewSubscription, Provenance},
    pagination::PageRequest,
    subscriber_email::SubscriberEmail,
    subscription::IntakeOutcome,
    subscription_status::SubscriptionStatus,
};
use waitlist::store::{PostgresSubscriptionStore, SubscriptionStore};

async fn spawn_store() -> (PostgresSubscriptionStore, sqlx::PgPool) {
    let mut config = get_configuration().expect("Missing configuration file.");
    let db_pool = configure_db(&mut config.database).await;

    (PostgresSubscriptionStore::new(db_pool.clone()), db_pool)
}

fn new_subscription(email: &str) -> NewSubscription {
    NewSubscription {
        email: SubscriberEmail::parse(email.to_string()).unwrap(),
        provenance: Provenance::new(
            Some(String::from("127.0.0.1")),
            Some(String::from("test-agent")),
            Some(String::from("coming-soon")),
        ),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres server"]
async fn register_persists_the_provenance() {
    let (store, db_pool) = spawn_store().await;

    store
        .register(&new_subscription("frank@test.com"))
        .await
        .unwrap();

    let (email, status, user_agent): (String, String, String) =
        sqlx::query("SELECT email, status, user_agent FROM subscriptions;")
            .map(|row: PgRow| (row.get("email"), row.get("status"), row.get("user_agent")))
            .fetch_one(&db_pool)
            .await
            .expect("Query to fetch subscriptions failed.");

    assert_eq!(email, "frank@test.com");
    assert_eq!(status, "ACTIVE");
    assert_eq!(user_agent, "test-agent");
}

#[tokio::test]
#[ignore = "requires a running Postgres server"]
async fn register_reports_duplicates_and_reactivates_unsubscribed_emails() {
    let (store, _) = spawn_store().await;
    let subscription = new_subscription("frank@test.com");

    let created = match store.register(&subscription).await.unwrap() {
        IntakeOutcome::Created(created) => created,
        other => panic!("Expected a creation, got {:?}", other),
    };
    assert!(matches!(
        store.register(&subscription).await.unwrap(),
        IntakeOutcome::AlreadyActive
    ));

    assert!(store.unsubscribe(&subscription.email).await.unwrap());

    match store.register(&subscription).await.unwrap() {
        IntakeOutcome::Reactivated(reactivated) => {
            assert_eq!(reactivated.id, created.id);
            assert!(reactivated.subscribed_at >= created.subscribed_at);
        }
        other => panic!("Expected a reactivation, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres server"]
async fn reactivation_never_moves_the_subscription_date_backwards() {
    let (store, db_pool) = spawn_store().await;
    // Written by an instance whose clock runs ahead.
    let ahead = Utc::now() + Duration::hours(1);

    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, email, status, subscribed_at, ip_address, user_agent, source)
        VALUES ($1, 'frank@test.com', 'UNSUBSCRIBED', $2, 'unknown', 'unknown', 'unknown')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(ahead)
    .execute(&db_pool)
    .await
    .expect("Failed to insert the subscription.");

    match store.register(&new_subscription("frank@test.com")).await.unwrap() {
        IntakeOutcome::Reactivated(reactivated) => {
            assert_eq!(reactivated.status, SubscriptionStatus::Active);
            // Postgres keeps microseconds only.
            assert!(reactivated.subscribed_at >= ahead - Duration::milliseconds(1));
        }
        other => panic!("Expected a reactivation, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres server"]
async fn concurrent_registrations_create_a_single_record() {
    let (store, _) = spawn_store().await;
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.register(&new_subscription("race@test.com")).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if let IntakeOutcome::Created(_) = handle.await.unwrap().unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(
        store.count_by_status(SubscriptionStatus::Active).await.unwrap(),
        1
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres server"]
async fn list_and_counts_cover_every_status() {
    let (store, _) = spawn_store().await;

    for index in 0..12 {
        store
            .register(&new_subscription(&format!("active-{}@test.com", index)))
            .await
            .unwrap();
    }
    store
        .unsubscribe(&SubscriberEmail::parse(String::from("active-0@test.com")).unwrap())
        .await
        .unwrap();

    let page = PageRequest::parse(Some(2), Some(10)).unwrap();
    let subscriptions = store.list(SubscriptionStatus::Active, &page).await.unwrap();
    let breakdown = store.count_per_status().await.unwrap();

    assert_eq!(subscriptions.len(), 1);
    assert_eq!(breakdown.get(&SubscriptionStatus::Active), Some(&11));
    assert_eq!(breakdown.get(&SubscriptionStatus::Unsubscribed), Some(&1));
}
