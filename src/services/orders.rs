use crate::{
    entities::{
        order, order_item, Order, OrderItem, OrderItemModel, OrderModel, OrderStatus, Product,
        ProductModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Order service. Orders and their line items are written together and are
/// immutable afterwards except for the status field.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Lists orders, newest first, optionally scoped to one user. Each order
    /// carries its nested line items with the product snapshot; items whose
    /// product has been deleted are dropped from the view.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        let mut query = Order::find().order_by_desc(order::Column::CreatedAt);
        if let Some(user_id) = user_id {
            query = query.filter(order::Column::UserId.eq(user_id));
        }

        let orders = query.all(&*self.db).await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let rows = OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        Ok(group_order_rows(orders, rows))
    }

    /// Fetches one order with its nested line items.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

        let rows = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let mut grouped = group_order_rows(vec![order], rows);
        // group_order_rows returns exactly one entry per input order
        Ok(grouped.remove(0))
    }

    /// Creates an order together with its line items in one transaction, so
    /// a failure can never leave an item-less order behind. Item prices are
    /// stored as sent: they are the purchase-time snapshot.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, items = input.items.len()))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderModel, ServiceError> {
        input.validate()?;
        if input.total < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Order total must be non-negative".to_string(),
            ));
        }
        for item in &input.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "Line item quantity must be at least 1".to_string(),
                ));
            }
        }

        let order_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(input.user_id),
            total: Set(input.total),
            status: Set(input.status.unwrap_or(OrderStatus::Pending)),
            shipping_address: Set(input.shipping_address),
            created_at: Set(Utc::now()),
        };
        let order = order.insert(&txn).await?;

        if !input.items.is_empty() {
            let items: Vec<order_item::ActiveModel> = input
                .items
                .into_iter()
                .map(|item| order_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order_id),
                    product_id: Set(item.product_id),
                    quantity: Set(item.quantity),
                    price: Set(item.price),
                })
                .collect();
            OrderItem::insert_many(items).exec(&txn).await?;
        }

        txn.commit().await?;

        self.event_sender.send_or_log(Event::OrderCreated(order_id)).await;

        info!("Created order {} for user {}", order_id, order.user_id);
        Ok(order)
    }

    /// Writes a new status. Every member of the status set is accepted from
    /// every prior state.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

        let old_status = order.status;
        let mut order: order::ActiveModel = order.into();
        order.status = Set(status);
        let order = order.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: id,
                old_status: old_status.to_string(),
                new_status: status.to_string(),
            })
            .await;

        Ok(order)
    }
}

/// Re-assembles flat (item, product) join rows into one entry per order,
/// preserving the order sequence. Rows without a product are dropped, so an
/// order with zero items comes back with an empty list rather than a
/// phantom item.
fn group_order_rows(
    orders: Vec<OrderModel>,
    rows: Vec<(OrderItemModel, Option<ProductModel>)>,
) -> Vec<OrderWithItems> {
    let mut items_by_order: HashMap<Uuid, Vec<OrderItemWithProduct>> = HashMap::new();
    for (item, product) in rows {
        let Some(product) = product else { continue };
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemWithProduct { item, product });
    }

    orders
        .into_iter()
        .map(|order| OrderWithItems {
            order_items: items_by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect()
}

/// Input for creating an order with its line items
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub user_id: Uuid,
    pub total: Decimal,
    pub status: Option<OrderStatus>,
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderLineInput>,
}

/// One line of an order-creation request
#[derive(Debug, Deserialize)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

/// Line item joined with its product snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemWithProduct {
    #[serde(flatten)]
    pub item: OrderItemModel,
    pub product: ProductModel,
}

/// Order with its nested line items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderModel,
    pub order_items: Vec<OrderItemWithProduct>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: Uuid) -> OrderModel {
        OrderModel {
            id,
            user_id: Uuid::new_v4(),
            total: dec!(10.00),
            status: OrderStatus::Pending,
            shipping_address: None,
            created_at: Utc::now(),
        }
    }

    fn item(order_id: Uuid, product_id: Uuid) -> OrderItemModel {
        OrderItemModel {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            quantity: 1,
            price: dec!(5.00),
        }
    }

    fn product(id: Uuid) -> ProductModel {
        ProductModel {
            id,
            name: "Widget".to_string(),
            description: None,
            price: dec!(5.00),
            sale_price: None,
            category_id: None,
            stock: 10,
            featured: false,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn grouping_assigns_items_to_their_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let p = Uuid::new_v4();

        let rows = vec![
            (item(a, p), Some(product(p))),
            (item(b, p), Some(product(p))),
            (item(a, p), Some(product(p))),
        ];

        let grouped = group_order_rows(vec![order(a), order(b)], rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].order.id, a);
        assert_eq!(grouped[0].order_items.len(), 2);
        assert_eq!(grouped[1].order.id, b);
        assert_eq!(grouped[1].order_items.len(), 1);
    }

    #[test]
    fn grouping_drops_rows_without_a_product() {
        let a = Uuid::new_v4();
        let p = Uuid::new_v4();

        let rows = vec![(item(a, p), None), (item(a, p), Some(product(p)))];
        let grouped = group_order_rows(vec![order(a)], rows);
        assert_eq!(grouped[0].order_items.len(), 1);
    }

    #[test]
    fn order_with_no_items_has_empty_list() {
        let a = Uuid::new_v4();
        let grouped = group_order_rows(vec![order(a)], Vec::new());
        assert_eq!(grouped.len(), 1);
        assert!(grouped[0].order_items.is_empty());
    }

    #[test]
    fn order_with_items_serializes_nested_list() {
        let a = Uuid::new_v4();
        let p = Uuid::new_v4();
        let grouped = group_order_rows(vec![order(a)], vec![(item(a, p), Some(product(p)))]);

        let json = serde_json::to_value(&grouped[0]).expect("serialization should succeed");
        assert_eq!(json["orderItems"].as_array().map(|a| a.len()), Some(1));
        assert_eq!(json["orderItems"][0]["product"]["name"], "Widget");
        assert_eq!(json["status"], "pending");
    }
}
