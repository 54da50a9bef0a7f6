mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn quote_follows_base_pack_pricing() {
    let app = TestApp::new();
    let user_id = app.create_user("quote@example.com").await;

    let (status, base) = app.get("/recharge/quote?messages=10", &user_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(base["totalPrice"].as_f64(), Some(30.0));

    let (_, larger) = app.get("/recharge/quote?messages=25", &user_id).await;
    assert_eq!(larger["totalPrice"].as_f64(), Some(75.0));
    assert_eq!(larger["basePack"], 10);
}

#[tokio::test]
async fn quote_outside_purchase_bounds_is_rejected() {
    let app = TestApp::new();
    let user_id = app.create_user("quote-bounds@example.com").await;

    let (low, _) = app.get("/recharge/quote?messages=9", &user_id).await;
    let (high, _) = app.get("/recharge/quote?messages=1001", &user_id).await;

    assert_eq!(low, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(high, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn purchase_credits_balance_and_records_billing() {
    let app = TestApp::new();
    let user_id = app.create_user("buyer@example.com").await;

    let (status, receipt) = app
        .post(
            "/recharge",
            &user_id,
            json!({ "messages": 25, "paymentRef": "pay_123" }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["messages"], 25);
    assert_eq!(receipt["totalPrice"].as_f64(), Some(75.0));
    assert_eq!(receipt["newBalance"], 25);
    assert_eq!(receipt["totalPurchased"], 25);
    let transaction_id = receipt["transactionId"].as_str().unwrap().to_string();

    let (_, history) = app.get("/recharge/history", &user_id).await;
    assert_eq!(history["balance"], 25);
    assert_eq!(history["history"][0]["transactionId"], transaction_id);

    let (_, transactions) = app.get("/billing/transactions", &user_id).await;
    assert_eq!(transactions[0]["id"], transaction_id);
    assert_eq!(transactions[0]["type"], "recharge");
    assert_eq!(transactions[0]["metadata"]["payment_ref"], "pay_123");

    let (_, invoices) = app.get("/billing/invoices", &user_id).await;
    assert_eq!(invoices.as_array().unwrap().len(), 1);
    assert_eq!(invoices[0]["status"], "paid");

    let invoice_id = invoices[0]["id"].as_str().unwrap();
    let (status, invoice) = app
        .get(&format!("/billing/invoices/{}", invoice_id), &user_id)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["items"][0]["quantity"], 25);
}

#[tokio::test]
async fn purchase_below_minimum_changes_nothing() {
    let app = TestApp::new();
    let user_id = app.create_user("small@example.com").await;

    let (status, _) = app
        .post("/recharge", &user_id, json!({ "messages": 5 }))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let user = app.load(&user_id).await;
    assert_eq!(user.recharge.balance, 0);
    assert!(user.transactions.is_empty());
    assert!(user.invoices.is_empty());
}

#[tokio::test]
async fn unknown_invoice_is_not_found() {
    let app = TestApp::new();
    let user_id = app.create_user("noinvoice@example.com").await;

    let (status, _) = app.get("/billing/invoices/inv_missing", &user_id).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
