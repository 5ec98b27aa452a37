mod common;

use axum::http::StatusCode;
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn adding_twice_yields_one_row_with_summed_quantity() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", dec!(19.99), None, false).await;

    let (status, body) = app
        .post(
            "/api/cart",
            json!({ "userId": user, "productId": product, "quantity": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 2);

    let (status, body) = app
        .post(
            "/api/cart",
            json!({ "userId": user, "productId": product, "quantity": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 5);

    let (status, body) = app.get(&format!("/api/cart/{}", user)).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 5);
    assert_eq!(items[0]["product"]["name"], "Widget");
}

#[tokio::test]
async fn concurrent_adds_do_not_lose_updates() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", dec!(19.99), None, false).await;

    let payload = json!({ "userId": user, "productId": product, "quantity": 1 });
    let (first, second) = tokio::join!(
        app.post("/api/cart", payload.clone()),
        app.post("/api/cart", payload.clone()),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);

    let (_, body) = app.get(&format!("/api/cart/{}", user)).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1, "concurrent adds must not duplicate rows");
    assert_eq!(items[0]["quantity"], 2, "no increment may be lost");
}

#[tokio::test]
async fn add_rejects_unknown_product_and_bad_quantity() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let (status, _) = app
        .post(
            "/api/cart",
            json!({ "userId": user, "productId": Uuid::new_v4(), "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let product = app.seed_product("Widget", dec!(19.99), None, false).await;
    let (status, _) = app
        .post(
            "/api/cart",
            json!({ "userId": user, "productId": product, "quantity": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn setting_quantity_updates_the_row() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", dec!(19.99), None, false).await;

    app.post(
        "/api/cart",
        json!({ "userId": user, "productId": product, "quantity": 1 }),
    )
    .await;

    let (status, body) = app
        .put(
            "/api/cart",
            json!({ "userId": user, "productId": product, "quantity": 7 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 7);
}

#[tokio::test]
async fn setting_quantity_to_zero_or_below_removes_the_row() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", dec!(19.99), None, false).await;

    app.post(
        "/api/cart",
        json!({ "userId": user, "productId": product, "quantity": 4 }),
    )
    .await;

    let (status, body) = app
        .put(
            "/api/cart",
            json!({ "userId": user, "productId": product, "quantity": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item removed from cart");

    let (_, body) = app.get(&format!("/api/cart/{}", user)).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    // Negative quantities take the same removal path.
    app.post(
        "/api/cart",
        json!({ "userId": user, "productId": product, "quantity": 4 }),
    )
    .await;
    let (status, _) = app
        .put(
            "/api/cart",
            json!({ "userId": user, "productId": product, "quantity": -1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/api/cart/{}", user)).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn updating_an_absent_row_is_404() {
    let app = TestApp::new().await;
    let product = app.seed_product("Widget", dec!(19.99), None, false).await;

    let (status, _) = app
        .put(
            "/api/cart",
            json!({ "userId": Uuid::new_v4(), "productId": product, "quantity": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_a_single_users_row() {
    let app = TestApp::new().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let product = app.seed_product("Widget", dec!(19.99), None, false).await;

    for user in [alice, bob] {
        app.post(
            "/api/cart",
            json!({ "userId": user, "productId": product, "quantity": 1 }),
        )
        .await;
    }

    let (status, body) = app
        .delete(&format!("/api/cart/{}/{}", alice, product))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item removed from cart");

    let (_, body) = app.get(&format!("/api/cart/{}", alice)).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    // Bob's cart is untouched.
    let (_, body) = app.get(&format!("/api/cart/{}", bob)).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}
