use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::ExtractedFields;

static SKU_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-_]+$").expect("valid regex"));

static BARCODE_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8,13}$").expect("valid regex"));

static URL_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://\S+\.\S+$").expect("valid regex"));

/// Outcome of validating one extracted row: blocking errors abort the row,
/// warnings are carried along while processing continues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RowValidation {
    pub fn is_blocked(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Checks required fields and format constraints on one extracted row.
pub fn validate_row(fields: &ExtractedFields) -> RowValidation {
    let mut validation = RowValidation::default();

    let sku = fields.get("sku");
    let name = fields.get("product_name");
    if sku.is_none() && name.is_none() {
        validation
            .errors
            .push("row has neither a sku nor a product name".to_string());
    }

    if let Some(sku) = sku {
        if !SKU_FORMAT.is_match(sku) {
            validation.errors.push(format!(
                "sku '{}' contains characters outside [A-Za-z0-9-_]",
                sku
            ));
        }
    }

    if let Some(price) = fields.get("price") {
        match price.trim().parse::<Decimal>() {
            Ok(value) if value.is_sign_negative() => {
                validation
                    .errors
                    .push(format!("price '{}' is negative", price));
            }
            Ok(_) => {}
            Err(_) => {
                validation
                    .errors
                    .push(format!("price '{}' is not numeric", price));
            }
        }
    }

    if let Some(barcode) = fields.get("barcode") {
        if !BARCODE_FORMAT.is_match(barcode) {
            validation
                .warnings
                .push(format!("barcode '{}' is not 8-13 digits", barcode));
        }
    }

    if let Some(urls) = fields.get("image_urls") {
        for url in urls.split(',').map(str::trim).filter(|u| !u.is_empty()) {
            if !URL_FORMAT.is_match(url) {
                validation
                    .warnings
                    .push(format!("image url '{}' is not a valid url", url));
            }
        }
    }

    validation
}
