use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Barcode attached to a variant. Symbology is derived purely from the
/// value length; global dedup is an external pool concern, so no uniqueness
/// is enforced at this layer.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "barcodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variant_id: Uuid,
    pub value: String,
    pub symbology: BarcodeSymbology,
    pub auto_detected: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    ProductVariant,
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Barcode symbology derived from value length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum BarcodeSymbology {
    #[sea_orm(string_value = "EAN8")]
    Ean8,
    #[sea_orm(string_value = "UPCA")]
    UpcA,
    #[sea_orm(string_value = "EAN13")]
    Ean13,
    #[sea_orm(string_value = "UPCE")]
    UpcE,
    #[sea_orm(string_value = "CODE128")]
    Code128,
}
