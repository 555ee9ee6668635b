use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::ImportConfig;
use crate::entities::product::{self, ProductStatus};
use crate::entities::product_variant::{self, VariantStatus};
use crate::errors::ImportError;
use crate::events::{Event, EventSender};
use crate::models::{ExtractedFields, ParentInfo};

/// Idempotent create-or-update of the Product and ProductVariant aggregates,
/// keyed by their natural keys. Safe to call repeatedly with identical
/// input; re-import means update, never duplicate.
#[derive(Clone)]
pub struct EntityResolver {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: ImportConfig,
}

impl EntityResolver {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: ImportConfig,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Upserts the parent product keyed by `parent_sku`. On insert the name,
    /// status and description come from the parent info; on conflict only
    /// name and description are updated. `parent_sku` is never mutated once
    /// set, and neither is the slug. Returns the model plus a was-created
    /// flag.
    #[instrument(skip(self, info, description))]
    pub async fn create_or_update_product(
        &self,
        info: &ParentInfo,
        description: Option<&str>,
    ) -> Result<(product::Model, bool), ImportError> {
        let existing = product::Entity::find()
            .filter(product::Column::ParentSku.eq(&info.parent_sku))
            .one(&*self.db)
            .await?;

        match existing {
            Some(model) => {
                let product_id = model.id;
                let mut active: product::ActiveModel = model.into();
                active.name = Set(info.product_name.clone());
                if let Some(description) = description {
                    active.description = Set(Some(description.to_string()));
                }
                active.updated_at = Set(Utc::now());
                let model = active.update(&*self.db).await?;

                self.event_sender
                    .send_or_log(Event::ProductUpdated(product_id))
                    .await;
                debug!(parent_sku = %info.parent_sku, "updated product");
                Ok((model, false))
            }
            None => {
                let model = self
                    .insert_product(
                        Some(info.parent_sku.clone()),
                        &info.product_name,
                        description,
                    )
                    .await?;
                Ok((model, true))
            }
        }
    }

    /// Upserts a true parent that has no SKU of its own (name-only
    /// grouping). The trimmed name acts as the natural key.
    #[instrument(skip(self))]
    pub async fn create_or_update_parent_by_name(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<(product::Model, bool), ImportError> {
        let name = name.trim();
        let existing = product::Entity::find()
            .filter(product::Column::ParentSku.is_null())
            .filter(product::Column::Name.eq(name))
            .one(&*self.db)
            .await?;

        match existing {
            Some(model) => {
                let product_id = model.id;
                let mut active: product::ActiveModel = model.into();
                if let Some(description) = description {
                    active.description = Set(Some(description.to_string()));
                }
                active.updated_at = Set(Utc::now());
                let model = active.update(&*self.db).await?;

                self.event_sender
                    .send_or_log(Event::ProductUpdated(product_id))
                    .await;
                Ok((model, false))
            }
            None => {
                let model = self.insert_product(None, name, description).await?;
                Ok((model, true))
            }
        }
    }

    async fn insert_product(
        &self,
        parent_sku: Option<String>,
        name: &str,
        description: Option<&str>,
    ) -> Result<product::Model, ImportError> {
        let product_id = Uuid::new_v4();
        let now = Utc::now();
        let slug = self.unique_slug(name).await?;

        let active = product::ActiveModel {
            id: Set(product_id),
            parent_sku: Set(parent_sku.clone()),
            name: Set(name.to_string()),
            slug: Set(slug),
            description: Set(description.map(str::to_string)),
            status: Set(ProductStatus::Active),
            features: Set(None),
            details: Set(None),
            is_parent: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = active.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;
        info!(?parent_sku, "created product {}", product_id);
        Ok(model)
    }

    /// Upserts a variant keyed by `sku`.
    ///
    /// Width and drop apply the legacy default substitution: absent or zero
    /// width falls back to the configured default (100), absent drop to the
    /// configured default (160). Price is written as 0 on insert and left
    /// untouched on update; the decoupled pricing subsystem owns it.
    #[instrument(skip(self, product, fields, info))]
    pub async fn create_or_update_variant(
        &self,
        product: &product::Model,
        fields: &ExtractedFields,
        info: &ParentInfo,
    ) -> Result<(product_variant::Model, bool), ImportError> {
        let sku = fields
            .get("sku")
            .ok_or_else(|| ImportError::Validation("variant upsert requires a sku".into()))?;

        let width = self.resolve_width(fields, info);
        let drop = self.resolve_drop(fields, info);
        let stock_level = fields
            .get("stock_level")
            .and_then(|s| s.trim().parse::<i32>().ok())
            .unwrap_or(0);

        let existing = product_variant::Entity::find()
            .filter(product_variant::Column::Sku.eq(sku))
            .one(&*self.db)
            .await?;

        match existing {
            Some(model) => {
                let variant_id = model.id;
                let mut active: product_variant::ActiveModel = model.into();
                active.product_id = Set(product.id);
                active.color = Set(info.color.clone());
                active.width_cm = Set(width);
                active.drop_cm = Set(drop);
                active.stock_level = Set(stock_level);
                active.updated_at = Set(Utc::now());
                let model = active.update(&*self.db).await?;

                self.event_sender
                    .send_or_log(Event::VariantUpdated(variant_id))
                    .await;
                debug!(sku, "updated variant");
                Ok((model, false))
            }
            None => {
                let variant_id = Uuid::new_v4();
                let now = Utc::now();
                let active = product_variant::ActiveModel {
                    id: Set(variant_id),
                    product_id: Set(product.id),
                    sku: Set(sku.to_string()),
                    color: Set(info.color.clone()),
                    width_cm: Set(width),
                    drop_cm: Set(drop),
                    price: Set(Decimal::ZERO),
                    stock_level: Set(stock_level),
                    status: Set(VariantStatus::Active),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                let model = active.insert(&*self.db).await?;

                self.event_sender
                    .send_or_log(Event::VariantCreated(variant_id))
                    .await;
                info!(sku, "created variant {}", variant_id);
                Ok((model, true))
            }
        }
    }

    fn resolve_width(&self, fields: &ExtractedFields, info: &ParentInfo) -> i32 {
        let width = fields
            .get("width")
            .and_then(|w| w.trim().parse::<i32>().ok())
            .or(info.width)
            .unwrap_or(0);
        if width <= 0 {
            self.config.default_width_cm
        } else {
            width
        }
    }

    fn resolve_drop(&self, fields: &ExtractedFields, info: &ParentInfo) -> i32 {
        fields
            .get("drop")
            .and_then(|d| d.trim().parse::<i32>().ok())
            .or(info.drop)
            .filter(|d| *d > 0)
            .unwrap_or(self.config.default_drop_cm)
    }

    /// Slugified name with a numeric-suffix retry on collision.
    async fn unique_slug(&self, name: &str) -> Result<String, ImportError> {
        let base = slugify(name);
        let mut candidate = base.clone();
        let mut suffix = 2;

        loop {
            let taken = product::Entity::find()
                .filter(product::Column::Slug.eq(&candidate))
                .one(&*self.db)
                .await?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
    }
}

/// Lowercases and hyphenates a name into a URL slug.
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "product".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Blackout Roller Blind"), "blackout-roller-blind");
        assert_eq!(slugify("  Day & Night  "), "day-night");
        assert_eq!(slugify("!!!"), "product");
    }
}
