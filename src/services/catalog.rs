use crate::{
    entities::{cart_item, category, product, CartItem, Category, CategoryModel, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Catalog service managing categories and products, including the
/// admin-facing mutations.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find().all(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;

        let category = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            icon: Set(input.icon),
        };

        let category = category.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CategoryCreated(category.id))
            .await;

        info!("Created category: {}", category.id);
        Ok(category)
    }

    /// Lists products with their category. All filter clauses combine with
    /// logical AND; the name search is a case-insensitive substring match.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductWithCategory>, ServiceError> {
        let mut query = Product::find().find_also_related(Category);

        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    product::Entity,
                    product::Column::Name,
                ))))
                .like(pattern),
            );
        }
        if filter.featured == Some(true) {
            query = query.filter(product::Column::Featured.eq(true));
        }

        let rows = query.all(&*self.db).await?;
        Ok(rows
            .into_iter()
            .map(|(product, category)| ProductWithCategory { product, category })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductWithCategory, ServiceError> {
        let (product, category) = Product::find_by_id(id)
            .find_also_related(Category)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        Ok(ProductWithCategory { product, category })
    }

    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            sale_price: Set(input.sale_price),
            category_id: Set(input.category_id),
            stock: Set(input.stock.unwrap_or(0)),
            featured: Set(input.featured.unwrap_or(false)),
            image_url: Set(input.image_url),
            created_at: Set(Utc::now()),
        };

        let product = product.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;

        info!("Created product: {}", product.id);
        Ok(product)
    }

    /// Applies a partial field patch. Absent fields are left unchanged.
    #[instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: Uuid,
        patch: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        patch.validate()?;

        let product = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let mut product: product::ActiveModel = product.into();
        if let Some(name) = patch.name {
            product.name = Set(name);
        }
        if let Some(description) = patch.description {
            product.description = Set(Some(description));
        }
        if let Some(price) = patch.price {
            product.price = Set(price);
        }
        if let Some(sale_price) = patch.sale_price {
            product.sale_price = Set(Some(sale_price));
        }
        if let Some(category_id) = patch.category_id {
            product.category_id = Set(Some(category_id));
        }
        if let Some(stock) = patch.stock {
            product.stock = Set(stock);
        }
        if let Some(featured) = patch.featured {
            product.featured = Set(featured);
        }
        if let Some(image_url) = patch.image_url {
            product.image_url = Set(Some(image_url));
        }

        let product = product.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product.id))
            .await;

        Ok(product)
    }

    /// Deletes a product and the cart rows that reference it, in one
    /// transaction. Order items keep their purchase-time snapshot rows.
    /// Deleting an id that no longer exists is a no-op.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        CartItem::delete_many()
            .filter(cart_item::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        Product::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::ProductDeleted(id)).await;

        info!("Deleted product: {}", id);
        Ok(())
    }
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("must be non-negative".into());
        Err(err)
    }
}

/// Product filters; clauses combine with AND
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub featured: Option<bool>,
}

/// Input for creating a category
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub sale_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub stock: Option<i32>,
    pub featured: Option<bool>,
    pub image_url: Option<String>,
}

/// Partial patch for a product; absent fields stay untouched
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, message = "Product name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub sale_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub stock: Option<i32>,
    pub featured: Option<bool>,
    pub image_url: Option<String>,
}

/// Product with its category, the shape every catalog read returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductWithCategory {
    #[serde(flatten)]
    pub product: ProductModel,
    pub category: Option<CategoryModel>,
}
