mod common;

use account_service::models::Plan;
use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn new_account_starts_with_community_quota() {
    let app = TestApp::new();
    let user_id = app.create_user("fresh@example.com").await;

    let (status, body) = app.get("/usage", &user_id).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["used"], 0);
    assert_eq!(body["limit"], 50);
    assert_eq!(body["remaining"], 50);
    assert_eq!(body["percentage"], 0);
    assert_eq!(body["rechargeBalance"], 0);
    assert!(body["resetDate"].is_string());
}

#[tokio::test]
async fn consume_defaults_to_one_message_from_plan_pool() {
    let app = TestApp::new();
    let user_id = app.create_user("one@example.com").await;

    let (status, body) = app
        .request(axum::http::Method::POST, "/usage/consume", Some(&user_id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["consumed"], 1);
    assert_eq!(body["source"], "plan");
    assert_eq!(body["used"], 1);
    assert_eq!(body["remaining"], 49);

    let user = app.load(&user_id).await;
    assert_eq!(user.usage.messages_used, 1);
    assert_eq!(user.usage_history.len(), 1);
    assert_eq!(user.usage_history[0].messages, 1);
}

#[tokio::test]
async fn exhausted_community_quota_returns_upgrade_required() {
    let app = TestApp::new();
    let user_id = app.create_user("full@example.com").await;
    app.edit(&user_id, |user| user.usage.messages_used = 50).await;

    let (status, body) = app
        .post("/usage/consume", &user_id, json!({ "count": 1 }))
        .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["upgradeRequired"], true);
    assert_eq!(body["used"], 50);
    assert_eq!(body["limit"], 50);
    assert_eq!(body["remaining"], 0);

    let user = app.load(&user_id).await;
    assert_eq!(user.usage.messages_used, 50);
    assert!(user.usage_history.is_empty());
}

#[tokio::test]
async fn overflow_draws_from_recharge_balance() {
    let app = TestApp::new();
    let user_id = app.create_user("overflow@example.com").await;
    app.edit(&user_id, |user| {
        user.usage.messages_used = 49;
        user.recharge.balance = 5;
    })
    .await;

    let (_, first) = app
        .post("/usage/consume", &user_id, json!({ "count": 1 }))
        .await;
    assert_eq!(first["source"], "plan");
    assert_eq!(first["used"], 50);
    assert_eq!(first["rechargeBalance"], 5);

    let (status, second) = app
        .post("/usage/consume", &user_id, json!({ "count": 1 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["source"], "recharge");
    assert_eq!(second["used"], 50);
    assert_eq!(second["rechargeBalance"], 4);
    assert_eq!(second["remaining"], 4);
}

#[tokio::test]
async fn consume_count_outside_bounds_is_rejected() {
    let app = TestApp::new();
    let user_id = app.create_user("bounds@example.com").await;

    let (zero, _) = app
        .post("/usage/consume", &user_id, json!({ "count": 0 }))
        .await;
    let (huge, _) = app
        .post("/usage/consume", &user_id, json!({ "count": 1001 }))
        .await;

    assert_eq!(zero, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(huge, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.load(&user_id).await.usage.messages_used, 0);
}

#[tokio::test]
async fn malformed_consume_body_is_rejected_without_charging() {
    let app = TestApp::new();
    let user_id = app.create_user("malformed@example.com").await;

    for body in [
        json!({ "count": -5 }),
        json!({ "count": "lots" }),
        json!({ "count": 4_294_967_296u64 }),
    ] {
        let (status, response) = app.post("/usage/consume", &user_id, body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response["error"].is_string());
    }

    let user = app.load(&user_id).await;
    assert_eq!(user.usage.messages_used, 0);
    assert!(user.usage_history.is_empty());
}

#[tokio::test]
async fn enterprise_usage_is_unlimited() {
    let app = TestApp::new();
    let user_id = app.create_user("big@example.com").await;
    app.edit(&user_id, |user| {
        user.plan = Plan::Enterprise;
        user.usage.messages_limit = -1;
    })
    .await;

    let (status, body) = app
        .post("/usage/consume", &user_id, json!({ "count": 1000 }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], "unlimited");
    assert_eq!(body["remaining"], "unlimited");
}

#[tokio::test]
async fn history_aggregates_daily_consumption() {
    let app = TestApp::new();
    let user_id = app.create_user("history@example.com").await;

    for count in [3, 4] {
        let (status, _) = app
            .post("/usage/consume", &user_id, json!({ "count": count }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.get("/usage/history?period=weekly", &user_id).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"], "weekly");
    assert_eq!(body["totalMessages"], 7);
    assert!(body["peakUsage"].as_u64().unwrap() >= 4);
    assert!(!body["series"].as_array().unwrap().is_empty());
}
