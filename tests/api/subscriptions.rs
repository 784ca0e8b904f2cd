use chrono::{Duration, Utc};

use crate::helpers::TestApp;
use waitlist::domain::subscription_status::SubscriptionStatus;

/// 25 active and 3 unsubscribed records, `active-0` being the newest.
async fn seed_waitlist(test_app: &TestApp) {
    let now = Utc::now();

    for index in 0..25 {
        test_app
            .seed(
                &format!("active-{}@test.com", index),
                SubscriptionStatus::Active,
                now - Duration::minutes(index),
            )
            .await;
    }

    for index in 0..3 {
        test_app
            .seed(
                &format!("gone-{}@test.com", index),
                SubscriptionStatus::Unsubscribed,
                now - Duration::minutes(index),
            )
            .await;
    }
}

#[tokio::test]
async fn listing_paginates_active_subscriptions() {
    let test_app = TestApp::spawn_app().await;
    seed_waitlist(&test_app).await;

    let response = test_app.get_subscriptions("?page=1&limit=10").await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    let pagination = &body["pagination"];

    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 10);
    assert_eq!(pagination["page"], 1);
    assert_eq!(pagination["limit"], 10);
    assert_eq!(pagination["totalCount"], 25);
    assert_eq!(pagination["totalPages"], 3);
    assert_eq!(pagination["hasNext"], true);
    assert_eq!(pagination["hasPrev"], false);
    assert_eq!(body["analytics"]["ACTIVE"], 25);
    assert_eq!(body["analytics"]["UNSUBSCRIBED"], 3);
}

#[tokio::test]
async fn listing_returns_the_newest_activations_first() {
    let test_app = TestApp::spawn_app().await;
    seed_waitlist(&test_app).await;

    let response = test_app.get_subscriptions("?page=2&limit=10").await;
    let body: serde_json::Value = response.json().await.unwrap();
    let emails: Vec<&str> = body["subscriptions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|subscription| subscription["email"].as_str().unwrap())
        .collect();

    assert_eq!(emails.first(), Some(&"active-10@test.com"));
    assert_eq!(emails.last(), Some(&"active-19@test.com"));

    let first = &body["subscriptions"][0];
    assert_eq!(first["status"], "ACTIVE");
    assert_eq!(first["source"], "seed");
    assert!(first["subscribedAt"].as_str().is_some());
    assert!(first["id"].as_str().is_some());
}

#[tokio::test]
async fn listing_last_page_has_previous_but_no_next() {
    let test_app = TestApp::spawn_app().await;
    seed_waitlist(&test_app).await;

    let response = test_app.get_subscriptions("?page=3&limit=10").await;
    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 5);
    assert_eq!(body["pagination"]["hasNext"], false);
    assert_eq!(body["pagination"]["hasPrev"], true);
}

#[tokio::test]
async fn listing_filters_by_status_without_changing_analytics() {
    let test_app = TestApp::spawn_app().await;
    seed_waitlist(&test_app).await;

    let response = test_app.get_subscriptions("?status=unsubscribed").await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 3);
    assert_eq!(body["pagination"]["totalCount"], 3);
    assert_eq!(body["pagination"]["totalPages"], 1);
    assert_eq!(body["analytics"]["ACTIVE"], 25);
    assert_eq!(body["analytics"]["UNSUBSCRIBED"], 3);
}

#[tokio::test]
async fn listing_uses_defaults_and_reports_empty_statuses() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get_subscriptions("").await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["totalPages"], 0);
    assert_eq!(body["analytics"]["ACTIVE"], 0);
    assert_eq!(body["analytics"]["UNSUBSCRIBED"], 0);
}

#[tokio::test]
async fn listing_returns_400_for_invalid_parameters() {
    let test_app = TestApp::spawn_app().await;

    let test_cases = vec![
        ("?status=PENDING", "unknown status"),
        ("?page=0", "page zero"),
        ("?limit=0", "limit zero"),
        ("?limit=1000", "limit above the maximum"),
        ("?page=-1", "negative page"),
        ("?limit=ten", "non numeric limit"),
    ];

    for (query, error_message) in test_cases {
        let response = test_app.get_subscriptions(query).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when query was {}",
            error_message
        );

        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().is_some());
    }
}
