use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::product_attribute::{self, AttributeDataType, AttributeScope};
use crate::errors::ImportError;
use crate::mapping::{unmapped_columns, MappingIndex};
use crate::models::RawRow;

/// Maximum length of a sanitized attribute key
const MAX_KEY_LENGTH: usize = 50;

/// Keys routed to the product scope. Kept as data so the routing is
/// reviewable and testable independently of the resolver.
pub const PRODUCT_ATTRIBUTE_KEYS: &[&str] = &[
    "brand",
    "category",
    "collection",
    "range",
    "style",
    "room",
    "material",
    "country_of_origin",
    "guarantee",
];

/// Keys explicitly claimed by the variant scope. Anything not claimed by the
/// product list also lands here: variant is the default bucket.
pub const VARIANT_ATTRIBUTE_KEYS: &[&str] = &[
    "fabric_composition",
    "fitting_type",
    "operation",
    "child_safety",
    "cleaning",
    "weight",
    "finish",
];

static DATE_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{2}/\d{2}/\d{4})$").expect("valid regex")
});

static URL_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://\S+$").expect("valid regex"));

/// Sanitizes a source header into an attribute key: lowercased,
/// non-alphanumerics to underscores, trimmed, truncated. A missing header
/// falls back to the column position.
pub fn sanitize_attribute_key(header: &str, column_index: usize) -> String {
    let key: String = header
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let key = key.trim_matches('_').to_string();
    if key.is_empty() {
        return format!("column_{}", column_index);
    }
    key.chars().take(MAX_KEY_LENGTH).collect()
}

/// Every unmapped, non-empty column of the row becomes an attribute
/// candidate keyed by its sanitized header.
pub fn detect_column_attributes(
    row: &RawRow,
    headers: &[String],
    index: &MappingIndex,
) -> BTreeMap<String, String> {
    unmapped_columns(row, headers, index)
        .into_iter()
        .map(|(i, header, value)| (sanitize_attribute_key(&header, i), value))
        .collect()
}

/// Merges ad-hoc attributes over auto-detected ones; ad-hoc wins on key
/// collision.
pub fn merge_attributes(
    detected: BTreeMap<String, String>,
    ad_hoc: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = detected;
    for (key, value) in ad_hoc {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Splits a merged attribute map into product-scoped and variant-scoped
/// buckets. Unknown keys default to the variant.
pub fn split_attributes(
    merged: BTreeMap<String, String>,
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let mut product = BTreeMap::new();
    let mut variant = BTreeMap::new();

    for (key, value) in merged {
        if PRODUCT_ATTRIBUTE_KEYS.contains(&key.as_str()) {
            product.insert(key, value);
        } else {
            variant.insert(key, value);
        }
    }
    (product, variant)
}

/// Infers the stored data type from the raw value.
pub fn infer_data_type(value: &str) -> AttributeDataType {
    let trimmed = value.trim();
    if trimmed.parse::<i64>().is_ok() {
        return AttributeDataType::Integer;
    }
    if trimmed.parse::<Decimal>().is_ok() {
        return AttributeDataType::Decimal;
    }
    if matches!(
        trimmed.to_lowercase().as_str(),
        "true" | "false" | "yes" | "no"
    ) {
        return AttributeDataType::Boolean;
    }
    if DATE_FORMAT.is_match(trimmed) {
        return AttributeDataType::Date;
    }
    if URL_VALUE.is_match(trimmed) {
        return AttributeDataType::Url;
    }
    AttributeDataType::Text
}

/// Upserts attributes against their owning product or variant.
#[derive(Clone)]
pub struct AttributeAssigner {
    db: Arc<DatabaseConnection>,
}

impl AttributeAssigner {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Splits the merged map and assigns each bucket to its owner.
    pub async fn assign(
        &self,
        product_id: Uuid,
        variant_id: Uuid,
        merged: BTreeMap<String, String>,
    ) -> Result<(), ImportError> {
        let (product_attrs, variant_attrs) = split_attributes(merged);
        self.assign_scope(product_id, AttributeScope::Product, product_attrs)
            .await?;
        self.assign_scope(variant_id, AttributeScope::Variant, variant_attrs)
            .await?;
        Ok(())
    }

    /// Upsert per `(scope, owner, key)`: re-assignment overwrites value,
    /// data type and category.
    async fn assign_scope(
        &self,
        owner_id: Uuid,
        scope: AttributeScope,
        attributes: BTreeMap<String, String>,
    ) -> Result<(), ImportError> {
        for (key, value) in attributes {
            let data_type = infer_data_type(&value);
            let existing = product_attribute::Entity::find()
                .filter(product_attribute::Column::OwnerId.eq(owner_id))
                .filter(product_attribute::Column::Scope.eq(scope))
                .filter(product_attribute::Column::Key.eq(&key))
                .one(&*self.db)
                .await?;

            match existing {
                Some(model) => {
                    let mut active: product_attribute::ActiveModel = model.into();
                    active.value = Set(value);
                    active.data_type = Set(data_type);
                    active.updated_at = Set(Utc::now());
                    active.update(&*self.db).await?;
                }
                None => {
                    let now = Utc::now();
                    let active = product_attribute::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        owner_id: Set(owner_id),
                        scope: Set(scope),
                        key: Set(key),
                        value: Set(value),
                        data_type: Set(data_type),
                        category: Set(None),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    active.insert(&*self.db).await?;
                }
            }
        }
        Ok(())
    }
}
