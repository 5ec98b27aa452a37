use crate::{
    entities::{cart_item, CartItem, CartItemModel, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Shopping cart service. Carts are keyed directly by user id; one row per
/// (user, product) pair.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the user's cart rows joined with their products. Rows whose
    /// product has been deleted out from under them are skipped rather than
    /// surfaced as malformed records.
    #[instrument(skip(self))]
    pub async fn get_cart_items(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CartItemWithProduct>, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| {
                product.map(|product| CartItemWithProduct { item, product })
            })
            .collect())
    }

    /// Adds a product to the cart, or increments the existing row's
    /// quantity. The exists-check and the write run inside one transaction
    /// so concurrent adds for the same (user, product) cannot lose updates;
    /// the unique index backs it up.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, input: AddToCartInput) -> Result<CartItemModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!("Product {} not found", input.product_id))
            })?;

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(input.user_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&txn)
            .await?;

        let item = if let Some(item) = existing {
            let quantity = item.quantity + input.quantity;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.update(&txn).await?
        } else {
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(input.user_id),
                product_id: Set(input.product_id),
                quantity: Set(input.quantity),
                created_at: Set(Utc::now()),
            };
            item.insert(&txn).await?
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id: input.user_id,
                product_id: input.product_id,
            })
            .await;

        info!(
            "Added to cart for user {}: product {} x{}",
            input.user_id, input.product_id, input.quantity
        );
        Ok(item)
    }

    /// Sets the quantity of an existing cart row. Callers route quantities
    /// of zero or below to `remove_from_cart` instead.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemModel, ServiceError> {
        let item = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        let item = item.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                user_id,
                product_id,
            })
            .await;

        Ok(item)
    }

    /// Removes a (user, product) row. Removing an absent row is a no-op.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                user_id,
                product_id,
            })
            .await;

        Ok(())
    }

    /// Deletes every cart row for the user.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<(), ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        self.event_sender.send_or_log(Event::CartCleared(user_id)).await;

        info!("Cleared cart for user {}", user_id);
        Ok(())
    }
}

/// Input for adding an item to a cart
#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartInput {
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Cart row joined with its product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemWithProduct {
    #[serde(flatten)]
    pub item: CartItemModel,
    pub product: ProductModel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_to_cart_input_rejects_non_positive_quantity() {
        let input = AddToCartInput {
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(input.validate().is_err());

        let input = AddToCartInput {
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: -3,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn add_to_cart_input_deserializes() {
        let json = r#"{
            "user_id": "550e8400-e29b-41d4-a716-446655440000",
            "product_id": "650e8400-e29b-41d4-a716-446655440000",
            "quantity": 2
        }"#;
        let input: AddToCartInput =
            serde_json::from_str(json).expect("deserialization should succeed");
        assert_eq!(input.quantity, 2);
    }
}
