use crate::entities::{CartItemModel, OrderModel};
use crate::errors::ErrorResponse;
use crate::services::carts::CartItemWithProduct;
use crate::services::catalog::ProductWithCategory;
use crate::services::orders::OrderWithItems;
use crate::services::payments::PaymentIntent;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

/// Errors surfaced to client-store callers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (status {status})")]
    Api { status: u16, message: String },
}

/// Typed client for the storefront HTTP surface.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Converts non-2xx responses into `ClientError::Api`, pulling the
    /// message out of the standard error body when present.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| status.to_string());
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn list_products(
        &self,
        search: Option<&str>,
        category_id: Option<Uuid>,
        featured: bool,
    ) -> Result<Vec<ProductWithCategory>, ClientError> {
        let mut request = self.http.get(self.url("/api/products"));
        if let Some(search) = search {
            request = request.query(&[("search", search)]);
        }
        if let Some(category_id) = category_id {
            request = request.query(&[("categoryId", category_id.to_string())]);
        }
        if featured {
            request = request.query(&[("featured", "true")]);
        }

        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductWithCategory, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/products/{}", id)))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn get_cart(&self, user_id: Uuid) -> Result<Vec<CartItemWithProduct>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/cart/{}", user_id)))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn add_to_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemModel, ClientError> {
        let response = self
            .http
            .post(self.url("/api/cart"))
            .json(&json!({
                "userId": user_id,
                "productId": product_id,
                "quantity": quantity,
            }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn update_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.url("/api/cart"))
            .json(&json!({
                "userId": user_id,
                "productId": product_id,
                "quantity": quantity,
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn remove_from_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/cart/{}/{}", user_id, product_id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<OrderWithItems>, ClientError> {
        let response = self
            .http
            .get(self.url("/api/orders"))
            .query(&[("userId", user_id.to_string())])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_order(
        &self,
        user_id: Uuid,
        total: Decimal,
        shipping_address: Option<&str>,
        items: &[(Uuid, i32, Decimal)],
    ) -> Result<OrderModel, ClientError> {
        let items: Vec<_> = items
            .iter()
            .map(|(product_id, quantity, price)| {
                json!({
                    "productId": product_id,
                    "quantity": quantity,
                    "price": price,
                })
            })
            .collect();

        let response = self
            .http
            .post(self.url("/api/orders"))
            .json(&json!({
                "userId": user_id,
                "total": total,
                "shippingAddress": shipping_address,
                "items": items,
            }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: Option<&str>,
        order_id: Option<Uuid>,
    ) -> Result<PaymentIntent, ClientError> {
        let response = self
            .http
            .post(self.url("/api/create-payment-intent"))
            .json(&json!({
                "amount": amount,
                "currency": currency,
                "orderId": order_id,
            }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
