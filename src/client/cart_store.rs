use crate::client::api::{ApiClient, ClientError};
use crate::services::catalog::ProductWithCategory;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

/// Fixed identity the storefront runs under until a real session layer
/// exists.
pub const DEMO_USER_ID: Uuid = Uuid::from_u128(1);

/// One line of the client-side cart: a product snapshot plus quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product: ProductWithCategory,
    pub quantity: i32,
}

impl CartLine {
    fn new(product: ProductWithCategory, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            product,
            quantity,
        }
    }

    /// The price this line is charged at: sale price when present.
    fn unit_price(&self) -> Decimal {
        self.product
            .product
            .sale_price
            .unwrap_or(self.product.product.price)
    }
}

/// What survives a reload: the item list and the user id. The open/closed
/// flag is deliberately excluded.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedCart {
    items: Vec<CartLine>,
    user_id: Uuid,
}

/// Client-side cart state, synchronized to the API on every mutation.
/// Mutations call the server first and touch local state only on success,
/// so local and server state cannot silently diverge.
#[derive(Debug)]
pub struct CartStore {
    api: ApiClient,
    storage_path: Option<PathBuf>,
    items: Vec<CartLine>,
    is_open: bool,
    user_id: Uuid,
}

impl CartStore {
    pub fn new(api: ApiClient, user_id: Uuid) -> Self {
        Self {
            api,
            storage_path: None,
            items: Vec::new(),
            is_open: false,
            user_id,
        }
    }

    /// Builds a store persisted at `path`, restoring any previously saved
    /// items (and the user id they belong to).
    pub fn with_storage(api: ApiClient, user_id: Uuid, path: PathBuf) -> Self {
        let mut store = Self::new(api, user_id);
        if let Some(persisted) = load_persisted(&path) {
            store.items = persisted.items;
            store.user_id = persisted.user_id;
        }
        store.storage_path = Some(path);
        store
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn toggle(&mut self) {
        self.is_open = !self.is_open;
    }

    /// Adds a product, incrementing an existing line when present.
    pub async fn add_item(
        &mut self,
        product: ProductWithCategory,
        quantity: i32,
    ) -> Result<(), ClientError> {
        self.api
            .add_to_cart(self.user_id, product.product.id, quantity)
            .await?;

        match self
            .items
            .iter_mut()
            .find(|line| line.product.product.id == product.product.id)
        {
            Some(line) => line.quantity += quantity,
            None => self.items.push(CartLine::new(product, quantity)),
        }

        self.persist();
        Ok(())
    }

    /// Removes a product's line entirely.
    pub async fn remove_item(&mut self, product_id: Uuid) -> Result<(), ClientError> {
        self.api.remove_from_cart(self.user_id, product_id).await?;

        self.items.retain(|line| line.product.product.id != product_id);
        self.persist();
        Ok(())
    }

    /// Sets a line's quantity; zero or below removes the line.
    pub async fn update_quantity(
        &mut self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), ClientError> {
        if quantity <= 0 {
            return self.remove_item(product_id).await;
        }

        self.api
            .update_cart(self.user_id, product_id, quantity)
            .await?;

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product.product.id == product_id)
        {
            line.quantity = quantity;
        }
        self.persist();
        Ok(())
    }

    /// Drops all local lines. Local-only: the server cart is left alone,
    /// matching the storefront's post-checkout reset.
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// Total unit count across all lines.
    pub fn total_items(&self) -> i64 {
        self.items.iter().map(|line| i64::from(line.quantity)).sum()
    }

    /// Total price across all lines, using the sale price when present.
    pub fn total_price(&self) -> Decimal {
        self.items
            .iter()
            .map(|line| line.unit_price() * Decimal::from(line.quantity))
            .sum()
    }

    fn persist(&self) {
        let Some(path) = &self.storage_path else {
            return;
        };
        let persisted = PersistedCart {
            items: self.items.clone(),
            user_id: self.user_id,
        };
        let result = serde_json::to_vec_pretty(&persisted)
            .map_err(|e| e.to_string())
            .and_then(|bytes| std::fs::write(path, bytes).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("Failed to persist cart state: {}", e);
        }
    }
}

fn load_persisted(path: &PathBuf) -> Option<PersistedCart> {
    let bytes = std::fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(persisted) => Some(persisted),
        Err(e) => {
            warn!("Discarding unreadable cart state: {}", e);
            None
        }
    }
}
