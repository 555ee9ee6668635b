use std::sync::Arc;

use assert_matches::assert_matches;
use catalog_import::entities::{
    barcode, product, product_attribute, product_variant, AttributeScope, BarcodeSymbology,
};
use catalog_import::models::{ColumnMapping, RawRow};
use catalog_import::services::{Heartbeat, ImportOptions, ImportRunner};
use catalog_import::{db, Event, EventSender, ImportConfig, ImportError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter};
use tokio::sync::mpsc;

/// Import runner backed by a fresh in-memory SQLite database. A single pool
/// connection keeps every query on the same memory database.
async fn setup() -> (ImportRunner, Arc<DatabaseConnection>, mpsc::Receiver<Event>) {
    setup_with_config(ImportConfig::default()).await
}

async fn setup_with_config(
    config: ImportConfig,
) -> (ImportRunner, Arc<DatabaseConnection>, mpsc::Receiver<Event>) {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let pool = Arc::new(
        Database::connect(options)
            .await
            .expect("failed to create test database"),
    );
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");

    let (tx, rx) = mpsc::channel(1024);
    let event_sender = Arc::new(EventSender::new(tx));
    let runner = ImportRunner::new(pool.clone(), event_sender, config);
    (runner, pool, rx)
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn row(number: usize, cells: &[&str]) -> RawRow {
    RawRow::new(number, cells.iter().map(|c| c.to_string()).collect())
}

fn standard_mapping() -> ColumnMapping {
    let mut mapping = ColumnMapping::new();
    mapping.insert("sku", "SKU");
    mapping.insert("product_name", "Product Title");
    mapping.insert("price", "Price");
    mapping.insert("barcode", "Barcode");
    mapping
}

fn drain_events(rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn letter_suffix_rows_share_one_parent_with_color_variants() {
    let (runner, pool, mut rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode", "Fabric Composition"]);
    let rows = vec![
        row(
            2,
            &[
                "45120RWST-White",
                "Roller Blind White 60cm",
                "49.99",
                "5012345678900",
                "100% Polyester",
            ],
        ),
        row(3, &["45120RWST-Blue", "Roller Blind Blue 60cm", "49.99", "", ""]),
    ];

    let result = runner
        .run(
            &headers,
            &rows,
            &standard_mapping(),
            &ImportOptions::default(),
            &Heartbeat::new(),
        )
        .await
        .expect("import run");

    assert_eq!(result.created_products, 1);
    assert_eq!(result.updated_products, 1);
    assert_eq!(result.created_variants, 2);
    assert_eq!(result.skipped_rows, 0);

    let products = product::Entity::find().all(&*pool).await.expect("products");
    assert_eq!(products.len(), 1);
    let parent = &products[0];
    assert_eq!(parent.parent_sku.as_deref(), Some("45120RWST"));
    assert_eq!(parent.name, "Roller Blind");
    assert!(parent.is_parent);

    let mut variants = product_variant::Entity::find()
        .all(&*pool)
        .await
        .expect("variants");
    variants.sort_by(|a, b| a.sku.cmp(&b.sku));
    assert_eq!(variants.len(), 2);
    assert!(variants.iter().all(|v| v.product_id == parent.id));
    assert_eq!(variants[0].sku, "45120RWST-Blue");
    assert_eq!(variants[0].color, "Blue");
    assert_eq!(variants[1].sku, "45120RWST-White");
    assert_eq!(variants[1].color, "White");
    for variant in &variants {
        assert_eq!(variant.width_cm, 60);
        assert_eq!(variant.drop_cm, 160);
        // Prices live in the pricing subsystem; the variant row stays 0.
        assert_eq!(variant.price, Decimal::ZERO);
    }

    let barcodes = barcode::Entity::find().all(&*pool).await.expect("barcodes");
    assert_eq!(barcodes.len(), 1);
    assert_eq!(barcodes[0].value, "5012345678900");
    assert_eq!(barcodes[0].symbology, BarcodeSymbology::Ean13);

    let attrs = product_attribute::Entity::find()
        .filter(product_attribute::Column::Key.eq("fabric_composition"))
        .all(&*pool)
        .await
        .expect("attributes");
    assert_eq!(attrs.len(), 1);
    assert_eq!(attrs[0].scope, AttributeScope::Variant);
    assert_eq!(attrs[0].value, "100% Polyester");

    let events = drain_events(&mut rx);
    let priced: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::VariantPriced {
                price_excluding_vat,
                vat_amount,
                ..
            } => Some((*price_excluding_vat, *vat_amount)),
            _ => None,
        })
        .collect();
    assert_eq!(priced.len(), 2);
    assert_eq!(priced[0], (dec!(41.66), dec!(8.33)));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ImportCompleted { created_variants: 2, .. })));
}

#[tokio::test]
async fn reimporting_the_same_sheet_updates_instead_of_duplicating() {
    let (runner, pool, _rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode"]);
    let rows = vec![
        row(2, &["010-108-060", "Day Night Blind Grey 60cm x 160cm", "25.00", ""]),
        row(3, &["010-108-090", "Day Night Blind Grey 90cm x 160cm", "30.00", ""]),
    ];
    let mapping = standard_mapping();
    let options = ImportOptions::default();

    let first = runner
        .run(&headers, &rows, &mapping, &options, &Heartbeat::new())
        .await
        .expect("first run");
    assert_eq!(first.created_products, 1);
    assert_eq!(first.created_variants, 2);

    let second = runner
        .run(&headers, &rows, &mapping, &options, &Heartbeat::new())
        .await
        .expect("second run");
    assert_eq!(second.created_products, 0);
    assert_eq!(second.created_variants, 0);
    assert_eq!(second.updated_products, 2);
    assert_eq!(second.updated_variants, 2);

    // Natural keys, not duplicates
    let products = product::Entity::find().all(&*pool).await.expect("products");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].parent_sku.as_deref(), Some("010-108"));
    let variants = product_variant::Entity::find()
        .all(&*pool)
        .await
        .expect("variants");
    assert_eq!(variants.len(), 2);
    assert_eq!(variants[0].width_cm, 60);
}

#[tokio::test]
async fn invalid_rows_are_skipped_and_reported() {
    let (runner, pool, mut rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode"]);
    let rows = vec![
        row(2, &["", "", "9.99", ""]),
        row(3, &["010-108-060", "Roller Blind", "not-a-price", ""]),
        row(4, &["010-108-090", "Roller Blind", "-5.00", ""]),
    ];

    let result = runner
        .run(
            &headers,
            &rows,
            &standard_mapping(),
            &ImportOptions::default(),
            &Heartbeat::new(),
        )
        .await
        .expect("import run");

    assert_eq!(result.skipped_rows, 3);
    assert_eq!(result.created_variants, 0);
    assert!(result.has_systemic_failure());
    assert!(result.errors.iter().any(|e| e.starts_with("Row 2:")));
    assert!(result.errors.iter().any(|e| e.starts_with("Row 3:")));

    assert_eq!(
        product::Entity::find().all(&*pool).await.expect("products").len(),
        0
    );

    let skips = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, Event::RowSkipped { .. }))
        .count();
    assert_eq!(skips, 3);
}

#[tokio::test]
async fn name_only_row_creates_a_parent_without_variants() {
    let (runner, pool, _rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode"]);
    let rows = vec![row(2, &["", "Shutter Collection", "", ""])];

    let result = runner
        .run(
            &headers,
            &rows,
            &standard_mapping(),
            &ImportOptions::default(),
            &Heartbeat::new(),
        )
        .await
        .expect("import run");

    assert_eq!(result.created_products, 1);
    assert_eq!(result.created_variants, 0);

    let products = product::Entity::find().all(&*pool).await.expect("products");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Shutter Collection");
    assert_eq!(products[0].parent_sku, None);
    assert_eq!(products[0].slug, "shutter-collection");
    assert!(
        product_variant::Entity::find()
            .all(&*pool)
            .await
            .expect("variants")
            .is_empty()
    );
}

#[tokio::test]
async fn mapped_brand_column_becomes_a_product_attribute() {
    let (runner, pool, _rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode", "Brand"]);
    let mut mapping = standard_mapping();
    mapping.insert("brand", "Brand");
    let rows = vec![row(2, &["45120RWST-White", "Roller Blind White", "19.99", "", "Acme"])];

    runner
        .run(
            &headers,
            &rows,
            &mapping,
            &ImportOptions::default(),
            &Heartbeat::new(),
        )
        .await
        .expect("import run");

    let parent = product::Entity::find()
        .one(&*pool)
        .await
        .expect("query")
        .expect("parent exists");
    let attrs = product_attribute::Entity::find()
        .filter(product_attribute::Column::Key.eq("brand"))
        .all(&*pool)
        .await
        .expect("attributes");
    assert_eq!(attrs.len(), 1);
    assert_eq!(attrs[0].scope, AttributeScope::Product);
    assert_eq!(attrs[0].owner_id, parent.id);
    assert_eq!(attrs[0].value, "Acme");
}

#[tokio::test]
async fn ad_hoc_attributes_apply_to_every_variant_and_win_collisions() {
    let (runner, pool, _rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode", "Cleaning"]);
    let rows = vec![row(
        2,
        &["45120RWST-White", "Roller Blind White", "19.99", "", "Wipe clean"],
    )];

    let mut options = ImportOptions::default();
    options
        .ad_hoc_attributes
        .insert("cleaning".to_string(), "Dry clean only".to_string());
    options
        .ad_hoc_attributes
        .insert("guarantee".to_string(), "5 years".to_string());

    runner
        .run(&headers, &rows, &standard_mapping(), &options, &Heartbeat::new())
        .await
        .expect("import run");

    let cleaning = product_attribute::Entity::find()
        .filter(product_attribute::Column::Key.eq("cleaning"))
        .one(&*pool)
        .await
        .expect("query")
        .expect("cleaning attribute");
    assert_eq!(cleaning.value, "Dry clean only");
    assert_eq!(cleaning.scope, AttributeScope::Variant);

    let guarantee = product_attribute::Entity::find()
        .filter(product_attribute::Column::Key.eq("guarantee"))
        .one(&*pool)
        .await
        .expect("query")
        .expect("guarantee attribute");
    assert_eq!(guarantee.scope, AttributeScope::Product);
}

#[tokio::test]
async fn explicit_parent_override_beats_sku_inference() {
    let (runner, pool, _rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode"]);
    let rows = vec![
        row(2, &["AAA-001", "Roman Blind Red", "10.00", ""]),
        row(3, &["BBB-002", "Roman Blind Blue", "10.00", ""]),
    ];

    let options = ImportOptions {
        parent_sku: Some("ROMANS".to_string()),
        parent_name: Some("Roman Blind".to_string()),
        ..Default::default()
    };

    let result = runner
        .run(&headers, &rows, &standard_mapping(), &options, &Heartbeat::new())
        .await
        .expect("import run");

    assert_eq!(result.created_products, 1);
    assert_eq!(result.created_variants, 2);

    let products = product::Entity::find().all(&*pool).await.expect("products");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].parent_sku.as_deref(), Some("ROMANS"));
    assert_eq!(products[0].name, "Roman Blind");
}

#[tokio::test]
async fn grouped_mode_buckets_rows_by_cleaned_name() {
    let (runner, pool, _rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode"]);
    let rows = vec![
        row(2, &["VEN-A1", "Venetian Blind White 60cm", "15.00", ""]),
        row(3, &["VEN-A2", "Venetian Blind Black 90cm", "18.00", ""]),
        row(4, &["ROL-B1", "Roller Blind Cream 60cm", "12.00", ""]),
    ];

    let result = runner
        .run_grouped(
            &headers,
            &rows,
            &standard_mapping(),
            &ImportOptions::default(),
            &Heartbeat::new(),
        )
        .await
        .expect("grouped run");

    assert_eq!(result.created_products, 2);
    assert_eq!(result.created_variants, 3);

    let products = product::Entity::find().all(&*pool).await.expect("products");
    assert_eq!(products.len(), 2);
    let venetian = products
        .iter()
        .find(|p| p.name.starts_with("Venetian"))
        .expect("venetian parent");

    let venetian_variants = product_variant::Entity::find()
        .filter(product_variant::Column::ProductId.eq(venetian.id))
        .all(&*pool)
        .await
        .expect("variants");
    assert_eq!(venetian_variants.len(), 2);
}

#[tokio::test]
async fn grouped_mode_keeps_sku_prefix_buckets_apart_when_names_coincide() {
    let (runner, pool, _rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode"]);
    // Both titles clean down to "Roller Blind" but the SKU prefixes differ,
    // so the rows belong to two different parents.
    let rows = vec![
        row(2, &["010-108", "Roller Blind Grey 60cm", "10.00", ""]),
        row(3, &["020-100", "Roller Blind Red 60cm", "12.00", ""]),
    ];

    let result = runner
        .run_grouped(
            &headers,
            &rows,
            &standard_mapping(),
            &ImportOptions::default(),
            &Heartbeat::new(),
        )
        .await
        .expect("grouped run");

    assert_eq!(result.created_products, 2);
    assert_eq!(result.created_variants, 2);

    let mut products = product::Entity::find().all(&*pool).await.expect("products");
    products.sort_by(|a, b| a.parent_sku.cmp(&b.parent_sku));
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].parent_sku.as_deref(), Some("010"));
    assert_eq!(products[1].parent_sku.as_deref(), Some("020"));
    assert!(products.iter().all(|p| p.name == "Roller Blind"));

    for product in &products {
        let variants = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(product.id))
            .all(&*pool)
            .await
            .expect("variants");
        assert_eq!(variants.len(), 1);
    }
}

#[tokio::test]
async fn slug_collisions_get_a_numeric_suffix() {
    let (runner, pool, _rx) = setup().await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode"]);
    // Different parents whose base names slugify identically
    let rows = vec![
        row(2, &["100-200-060", "Linen Blind Grey", "10.00", ""]),
        row(3, &["300-400-060", "Linen Blind Grey", "10.00", ""]),
    ];

    let result = runner
        .run(
            &headers,
            &rows,
            &standard_mapping(),
            &ImportOptions::default(),
            &Heartbeat::new(),
        )
        .await
        .expect("import run");
    assert_eq!(result.created_products, 2);

    let mut slugs: Vec<String> = product::Entity::find()
        .all(&*pool)
        .await
        .expect("products")
        .into_iter()
        .map(|p| p.slug)
        .collect();
    slugs.sort();
    assert_eq!(slugs, vec!["linen-blind", "linen-blind-2"]);
}

#[tokio::test]
async fn stale_heartbeat_cancels_the_run() {
    let config = ImportConfig {
        heartbeat_timeout_secs: 0,
        ..Default::default()
    };
    let (runner, pool, _rx) = setup_with_config(config).await;
    let headers = headers(&["SKU", "Product Title", "Price", "Barcode"]);
    let rows = vec![row(2, &["010-108-060", "Roller Blind", "10.00", ""])];

    let heartbeat = Heartbeat::new();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let result = runner
        .run(
            &headers,
            &rows,
            &standard_mapping(),
            &ImportOptions::default(),
            &heartbeat,
        )
        .await;

    assert_matches!(result, Err(ImportError::Cancelled));
    assert!(
        product::Entity::find()
            .all(&*pool)
            .await
            .expect("products")
            .is_empty()
    );
}

#[tokio::test]
async fn unmappable_headers_fail_fast() {
    let (runner, pool, _rx) = setup().await;
    let headers = headers(&["Col A", "Col B"]);
    let rows = vec![row(2, &["x", "y"])];

    let result = runner
        .run(
            &headers,
            &rows,
            &ColumnMapping::new(),
            &ImportOptions::default(),
            &Heartbeat::new(),
        )
        .await;

    assert_matches!(result, Err(ImportError::InvalidMapping(_)));
    assert!(
        product::Entity::find()
            .all(&*pool)
            .await
            .expect("products")
            .is_empty()
    );
}

#[tokio::test]
async fn guessed_mapping_handles_recognizable_headers() {
    let (runner, pool, _rx) = setup().await;
    // No mapping supplied; headers are close enough to guess
    let headers = headers(&["Parent SKU", "Product Name", "SKU", "Retail Price"]);
    let rows = vec![row(2, &["45120RWST", "Vertical Blind Ivory", "45120RWST-Ivory", "22.50"])];

    let result = runner
        .run(
            &headers,
            &rows,
            &ColumnMapping::new(),
            &ImportOptions::default(),
            &Heartbeat::new(),
        )
        .await
        .expect("import run");

    assert_eq!(result.created_products, 1);
    assert_eq!(result.created_variants, 1);

    let parent = product::Entity::find()
        .one(&*pool)
        .await
        .expect("query")
        .expect("parent exists");
    assert_eq!(parent.parent_sku.as_deref(), Some("45120RWST"));
}
