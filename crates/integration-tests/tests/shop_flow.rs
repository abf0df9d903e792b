//! End-to-end shopping against a running server.
//!
//! The server needs a migrated database and Stripe test keys.

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use cyber_shop_integration_tests::live_base_url;

/// A client that keeps the session cookie.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build client")
}

/// Sign up and sign in a fresh shopper, returning their email.
async fn signed_in_shopper(client: &Client, base_url: &str) -> String {
    let id = Uuid::new_v4();
    let email = format!("integration-test-{id}@example.com");
    let password = "a long enough password";

    let resp = client
        .post(format!("{base_url}/api/auth/signup"))
        .json(&json!({ "name": format!("Shopper {id}"), "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to sign up");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base_url}/api/auth/signin"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to sign in");
    assert_eq!(resp.status(), StatusCode::OK);

    email
}

/// Create an available product owned by the signed-in user.
async fn create_product(client: &Client, base_url: &str, price: i64) -> Value {
    let resp = client
        .post(format!("{base_url}/api/products"))
        .json(&json!({
            "name": format!("Test Product {}", Uuid::new_v4()),
            "description": "Made by the integration tests",
            "status": "AVAILABLE",
            "price": price,
        }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("Failed to parse product")
}

#[tokio::test]
#[ignore = "Requires running shop server and database"]
async fn test_me_after_sign_in() {
    let client = client();
    let base_url = live_base_url();
    let email = signed_in_shopper(&client, &base_url).await;

    let me: Value = client
        .get(format!("{base_url}/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current user")
        .json()
        .await
        .expect("Failed to parse current user");

    assert_eq!(me["email"], email.as_str());

    let resp = client
        .post(format!("{base_url}/api/auth/signout"))
        .send()
        .await
        .expect("Failed to sign out");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let me: Value = client
        .get(format!("{base_url}/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current user")
        .json()
        .await
        .expect("Failed to parse current user");
    assert_eq!(me, Value::Null);
}

#[tokio::test]
#[ignore = "Requires running shop server and database"]
async fn test_add_to_cart_twice_bumps_quantity() {
    let client = client();
    let base_url = live_base_url();
    signed_in_shopper(&client, &base_url).await;
    let product = create_product(&client, &base_url, 2499).await;

    let mut last = Value::Null;
    for _ in 0..2 {
        let resp = client
            .post(format!("{base_url}/api/mutations/add-to-cart"))
            .json(&json!({ "productId": product["id"] }))
            .send()
            .await
            .expect("Failed to add to cart");
        assert_eq!(resp.status(), StatusCode::OK);
        last = resp.json().await.expect("Failed to parse cart item");
    }
    assert_eq!(last["quantity"], 2);

    let cart: Vec<Value> = client
        .get(format!("{base_url}/api/cart-items"))
        .send()
        .await
        .expect("Failed to list cart")
        .json()
        .await
        .expect("Failed to parse cart");
    assert_eq!(cart.len(), 1);
}

#[tokio::test]
#[ignore = "Requires running shop server, database and Stripe test keys"]
async fn test_checkout_turns_cart_into_order() {
    let client = client();
    let base_url = live_base_url();
    signed_in_shopper(&client, &base_url).await;
    let product = create_product(&client, &base_url, 2499).await;

    for _ in 0..2 {
        client
            .post(format!("{base_url}/api/mutations/add-to-cart"))
            .json(&json!({ "productId": product["id"] }))
            .send()
            .await
            .expect("Failed to add to cart");
    }

    let resp = client
        .post(format!("{base_url}/api/mutations/checkout"))
        .json(&json!({ "token": "pm_card_visa" }))
        .send()
        .await
        .expect("Failed to check out");
    assert_eq!(resp.status(), StatusCode::OK);

    let order: Value = resp.json().await.expect("Failed to parse order");
    assert_eq!(order["total"], 4998);
    assert_eq!(order["label"], "$49.98");
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["quantity"], 2);

    let cart: Vec<Value> = client
        .get(format!("{base_url}/api/cart-items"))
        .send()
        .await
        .expect("Failed to list cart")
        .json()
        .await
        .expect("Failed to parse cart");
    assert!(cart.is_empty());

    let resp = client
        .post(format!("{base_url}/api/mutations/checkout"))
        .json(&json!({ "token": "pm_card_visa" }))
        .send()
        .await
        .expect("Failed to check out");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
