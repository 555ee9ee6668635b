/// Catalog entities owned by the import pipeline
pub mod barcode;
pub mod product;
pub mod product_attribute;
pub mod product_variant;

// Re-export entities
pub use barcode::{BarcodeSymbology, Entity as Barcode, Model as BarcodeModel};
pub use product::{Entity as Product, Model as ProductModel, ProductStatus};
pub use product_attribute::{
    AttributeDataType, AttributeScope, Entity as ProductAttribute, Model as ProductAttributeModel,
};
pub use product_variant::{
    Entity as ProductVariant, Model as ProductVariantModel, VariantStatus,
};
