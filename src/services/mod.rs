//! Service layer: the import orchestrator plus the focused collaborators it
//! drives (natural-key upserts, pricing breakdowns, barcode and attribute
//! assignment).

pub mod attributes;
pub mod barcodes;
pub mod entity_resolver;
pub mod import_runner;
pub mod pricing;

pub use attributes::AttributeAssigner;
pub use barcodes::BarcodeAssigner;
pub use entity_resolver::EntityResolver;
pub use import_runner::{Heartbeat, ImportOptions, ImportRunner};
pub use pricing::{PricingCalculator, VariantPricing};
