use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::barcode::{self, BarcodeSymbology};
use crate::errors::ImportError;

/// Symbology is purely a function of value length.
pub fn symbology_for(value: &str) -> BarcodeSymbology {
    match value.len() {
        8 => BarcodeSymbology::Ean8,
        12 => BarcodeSymbology::UpcA,
        13 => BarcodeSymbology::Ean13,
        6 => BarcodeSymbology::UpcE,
        _ => BarcodeSymbology::Code128,
    }
}

/// Attaches barcodes to variants. Dedup across the whole pool is an external
/// concern; this layer only avoids re-inserting the same value for the same
/// variant on re-import.
#[derive(Clone)]
pub struct BarcodeAssigner {
    db: Arc<DatabaseConnection>,
}

impl BarcodeAssigner {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// One set-membership query for a whole batch of barcode values, so the
    /// runner never issues per-row existence checks.
    pub async fn existing_values(
        &self,
        values: &[String],
    ) -> Result<HashSet<String>, ImportError> {
        if values.is_empty() {
            return Ok(HashSet::new());
        }
        let found = barcode::Entity::find()
            .filter(barcode::Column::Value.is_in(values.iter().cloned()))
            .all(&*self.db)
            .await?;
        Ok(found.into_iter().map(|b| b.value).collect())
    }

    /// Inserts a barcode for the variant unless the same value is already
    /// attached to it. Returns whether a row was inserted.
    pub async fn assign(
        &self,
        variant_id: Uuid,
        value: &str,
        auto_detected: bool,
    ) -> Result<bool, ImportError> {
        let existing = barcode::Entity::find()
            .filter(barcode::Column::VariantId.eq(variant_id))
            .filter(barcode::Column::Value.eq(value))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            debug!(%variant_id, value, "barcode already attached");
            return Ok(false);
        }

        let model = barcode::ActiveModel {
            id: Set(Uuid::new_v4()),
            variant_id: Set(variant_id),
            value: Set(value.to_string()),
            symbology: Set(symbology_for(value)),
            auto_detected: Set(auto_detected),
            created_at: Set(Utc::now()),
        };
        model.insert(&*self.db).await?;
        Ok(true)
    }
}
