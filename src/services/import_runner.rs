use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tracing::{debug, info, instrument, warn};

use crate::config::ImportConfig;
use crate::errors::ImportError;
use crate::events::{Event, EventSender};
use crate::grouping::{GroupingEngine, LeadingTokenGrouper, NameSimilarityGrouper};
use crate::mapping::{extract_row, FieldMapper, MappingIndex};
use crate::models::{
    ColumnMapping, ExtractedFields, ImportResult, ImportRowOutcome, ParentInfo, RawRow,
};
use crate::resolution::{resolve_parent_info, DEFAULT_COLOR};
use crate::services::attributes::{detect_column_attributes, merge_attributes, AttributeAssigner};
use crate::services::barcodes::BarcodeAssigner;
use crate::services::entity_resolver::EntityResolver;
use crate::services::pricing::PricingCalculator;
use crate::validation::validate_row;

/// Liveness signal owned by the caller. The runner checks it between
/// chunks and aborts with [`ImportError::Cancelled`] once it goes stale,
/// so an abandoned upload cannot keep writing forever.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    last_beat: Arc<RwLock<Instant>>,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self {
            last_beat: Arc::new(RwLock::new(Instant::now())),
        }
    }

    pub fn beat(&self) {
        if let Ok(mut last) = self.last_beat.write() {
            *last = Instant::now();
        }
    }

    pub fn is_stale(&self, timeout: Duration) -> bool {
        match self.last_beat.read() {
            Ok(last) => last.elapsed() > timeout,
            // A poisoned lock means the beating task panicked; treat as stale.
            Err(_) => true,
        }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-run knobs supplied by the caller alongside the sheet itself.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Attributes applied to every imported variant, on top of the ones
    /// auto-detected from unmapped columns. Wins on key collision.
    pub ad_hoc_attributes: BTreeMap<String, String>,
    /// Forces every row under this parent SKU, bypassing SKU inference.
    pub parent_sku: Option<String>,
    /// Forces the parent product name when `parent_sku` is set.
    pub parent_name: Option<String>,
}

/// Drives a whole import run: mapping, validation, parent resolution,
/// upserts and side effects, in chunks with progress events in between.
pub struct ImportRunner {
    resolver: EntityResolver,
    pricing: PricingCalculator,
    barcodes: BarcodeAssigner,
    attributes: AttributeAssigner,
    grouping: GroupingEngine,
    event_sender: Arc<EventSender>,
    config: ImportConfig,
}

impl ImportRunner {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: ImportConfig,
    ) -> Self {
        Self::with_grouper(db, event_sender, config, Arc::new(LeadingTokenGrouper))
    }

    pub fn with_grouper(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: ImportConfig,
        grouper: Arc<dyn NameSimilarityGrouper>,
    ) -> Self {
        Self {
            resolver: EntityResolver::new(db.clone(), event_sender.clone(), config.clone()),
            pricing: PricingCalculator::new(config.vat_rate_decimal()),
            barcodes: BarcodeAssigner::new(db.clone()),
            attributes: AttributeAssigner::new(db),
            grouping: GroupingEngine::new(grouper),
            event_sender,
            config,
        }
    }

    /// Processes the sheet row by row, inferring each row's parent from its
    /// SKU. Database failures abort the run; per-row defects become skips.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn run(
        &self,
        headers: &[String],
        rows: &[RawRow],
        mapping: &ColumnMapping,
        options: &ImportOptions,
        heartbeat: &Heartbeat,
    ) -> Result<ImportResult, ImportError> {
        let index = self.build_index(headers, mapping)?;
        let timeout = Duration::from_secs(self.config.heartbeat_timeout_secs);

        let mut result = ImportResult::new();
        let mut processed = 0usize;

        for chunk in rows.chunks(self.config.chunk_size) {
            if heartbeat.is_stale(timeout) {
                warn!(processed, "heartbeat went stale, aborting run");
                return Err(ImportError::Cancelled);
            }

            let mut known_barcodes = self.chunk_barcodes(chunk, headers, &index).await?;
            for row in chunk {
                let row_result = self
                    .process_row(row, headers, &index, options, &mut known_barcodes)
                    .await?;
                result.merge(row_result);
            }

            processed += chunk.len();
            self.event_sender
                .send_or_log(Event::ImportProgress {
                    processed,
                    total: rows.len(),
                })
                .await;
        }

        self.finish(&result).await;
        Ok(result)
    }

    /// Processes the sheet in explicit parent groups instead of per-row SKU
    /// inference: rows are bucketed first, one parent is upserted per
    /// bucket, and every row's variant attaches to its bucket's parent.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn run_grouped(
        &self,
        headers: &[String],
        rows: &[RawRow],
        mapping: &ColumnMapping,
        options: &ImportOptions,
        heartbeat: &Heartbeat,
    ) -> Result<ImportResult, ImportError> {
        let index = self.build_index(headers, mapping)?;
        let timeout = Duration::from_secs(self.config.heartbeat_timeout_secs);

        let extracted: Vec<ExtractedFields> = rows
            .iter()
            .map(|row| extract_row(row, headers, &index))
            .collect();
        let groups = self.grouping.group_rows(&extracted);
        info!(groups = groups.len(), "grouped rows into parent buckets");

        let mut result = ImportResult::new();
        let mut processed = 0usize;

        for group in groups {
            if heartbeat.is_stale(timeout) {
                warn!(processed, "heartbeat went stale, aborting run");
                return Err(ImportError::Cancelled);
            }

            // SKU-keyed buckets upsert on their prefix so two buckets whose
            // cleaned names coincide still land on separate parents. Name
            // and fuzzy buckets carry distinct names by construction and
            // upsert on the name itself.
            let (parent, created) = match group.sku_prefix() {
                Some(prefix) => {
                    let info = ParentInfo {
                        parent_sku: prefix.to_string(),
                        product_name: group.parent_name.clone(),
                        color: DEFAULT_COLOR.to_string(),
                        width: None,
                        drop: None,
                    };
                    self.resolver.create_or_update_product(&info, None).await?
                }
                None => {
                    self.resolver
                        .create_or_update_parent_by_name(&group.parent_name, None)
                        .await?
                }
            };
            result.record_product(created);

            let group_rows: Vec<&RawRow> = group.rows.iter().map(|&i| &rows[i]).collect();
            let mut known_barcodes = self
                .chunk_barcodes_of(&group_rows, headers, &index)
                .await?;

            for &row_index in &group.rows {
                let row = &rows[row_index];
                let fields = &extracted[row_index];
                let row_result = self
                    .process_variant_row(row, fields, headers, &index, options, &parent, &mut known_barcodes)
                    .await?;
                result.merge(row_result);
            }

            processed += group.rows.len();
            self.event_sender
                .send_or_log(Event::ImportProgress {
                    processed,
                    total: rows.len(),
                })
                .await;
        }

        self.finish(&result).await;
        Ok(result)
    }

    fn build_index(
        &self,
        headers: &[String],
        mapping: &ColumnMapping,
    ) -> Result<MappingIndex, ImportError> {
        let index = if mapping.is_empty() {
            let guessed = FieldMapper::guess_mapping(headers);
            info!(fields = guessed.len(), "no mapping supplied, guessed from headers");
            MappingIndex::build(headers, &guessed)
        } else {
            MappingIndex::build(headers, mapping)
        };

        if index.is_empty() {
            return Err(ImportError::InvalidMapping(
                "no source column maps to any known field".to_string(),
            ));
        }
        Ok(index)
    }

    /// One batched existence query for every barcode value in the chunk.
    async fn chunk_barcodes(
        &self,
        chunk: &[RawRow],
        headers: &[String],
        index: &MappingIndex,
    ) -> Result<HashSet<String>, ImportError> {
        let refs: Vec<&RawRow> = chunk.iter().collect();
        self.chunk_barcodes_of(&refs, headers, index).await
    }

    async fn chunk_barcodes_of(
        &self,
        chunk: &[&RawRow],
        headers: &[String],
        index: &MappingIndex,
    ) -> Result<HashSet<String>, ImportError> {
        let values: Vec<String> = chunk
            .iter()
            .filter_map(|row| {
                extract_row(row, headers, index)
                    .get("barcode")
                    .map(str::to_string)
            })
            .collect();
        self.barcodes.existing_values(&values).await
    }

    async fn process_row(
        &self,
        row: &RawRow,
        headers: &[String],
        index: &MappingIndex,
        options: &ImportOptions,
        known_barcodes: &mut HashSet<String>,
    ) -> Result<ImportResult, ImportError> {
        let fields = extract_row(row, headers, index);
        let mut result = ImportResult::new();

        let validation = validate_row(&fields);
        if validation.is_blocked() {
            let reason = validation.errors.join("; ");
            self.skip(&mut result, row.number, reason).await;
            return Ok(result);
        }
        for warning in &validation.warnings {
            warn!(row = row.number, "{}", warning);
        }

        let Some(sku) = fields.get("sku") else {
            // Name-only rows describe the parent itself, not a variant.
            let name = fields
                .get("product_name")
                .unwrap_or_default()
                .to_string();
            let (_, created) = self
                .resolver
                .create_or_update_parent_by_name(&name, fields.get("description"))
                .await?;
            result.record_product(created);
            return Ok(result);
        };

        let info = self.parent_info_for(sku, &fields, options);
        let (product, created) = self
            .resolver
            .create_or_update_product(&info, fields.get("description"))
            .await?;
        result.record_product(created);

        self.upsert_variant(
            row,
            &fields,
            headers,
            index,
            &info,
            &product,
            options,
            known_barcodes,
            &mut result,
        )
        .await?;
        Ok(result)
    }

    /// Variant-only path used by grouped mode; the parent is already
    /// resolved per bucket.
    #[allow(clippy::too_many_arguments)]
    async fn process_variant_row(
        &self,
        row: &RawRow,
        fields: &ExtractedFields,
        headers: &[String],
        index: &MappingIndex,
        options: &ImportOptions,
        parent: &crate::entities::product::Model,
        known_barcodes: &mut HashSet<String>,
    ) -> Result<ImportResult, ImportError> {
        let mut result = ImportResult::new();

        let validation = validate_row(fields);
        if validation.is_blocked() {
            let reason = validation.errors.join("; ");
            self.skip(&mut result, row.number, reason).await;
            return Ok(result);
        }

        let Some(sku) = fields.get("sku") else {
            self.skip(&mut result, row.number, "group member has no sku".to_string())
                .await;
            return Ok(result);
        };

        let mut info = self.parent_info_for(sku, fields, options);
        // The bucket owns the parent identity in grouped mode.
        info.parent_sku = parent.parent_sku.clone().unwrap_or_else(|| parent.name.clone());
        info.product_name = parent.name.clone();

        self.upsert_variant(
            row,
            fields,
            headers,
            index,
            &info,
            parent,
            options,
            known_barcodes,
            &mut result,
        )
        .await?;
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn upsert_variant(
        &self,
        row: &RawRow,
        fields: &ExtractedFields,
        headers: &[String],
        index: &MappingIndex,
        info: &ParentInfo,
        product: &crate::entities::product::Model,
        options: &ImportOptions,
        known_barcodes: &mut HashSet<String>,
        result: &mut ImportResult,
    ) -> Result<(), ImportError> {
        let (variant, created) = self
            .resolver
            .create_or_update_variant(product, fields, info)
            .await?;
        let outcome = if created {
            ImportRowOutcome::Created
        } else {
            ImportRowOutcome::Updated
        };
        result.record_outcome(row.number, &outcome);

        if let Some(price) = fields.get("price").and_then(|p| p.trim().parse::<Decimal>().ok())
        {
            if let Some(pricing) = self.pricing.breakdown(price) {
                self.event_sender
                    .send_or_log(Event::VariantPriced {
                        variant_id: variant.id,
                        price_excluding_vat: pricing.price_excluding_vat,
                        vat_amount: pricing.vat_amount,
                    })
                    .await;
            }
        }

        if let Some(value) = fields.get("barcode") {
            if known_barcodes.contains(value) {
                debug!(row = row.number, value, "barcode value already registered");
            } else if self.barcodes.assign(variant.id, value, false).await? {
                known_barcodes.insert(value.to_string());
            }
        }

        let mut detected = detect_column_attributes(row, headers, index);
        // Mapped brand and category columns live as attributes, not as
        // dedicated product fields.
        for key in ["brand", "category"] {
            if let Some(value) = fields.get(key) {
                detected.entry(key.to_string()).or_insert_with(|| value.to_string());
            }
        }
        let merged = merge_attributes(detected, &options.ad_hoc_attributes);
        if !merged.is_empty() {
            self.attributes
                .assign(product.id, variant.id, merged)
                .await?;
        }

        Ok(())
    }

    fn parent_info_for(
        &self,
        sku: &str,
        fields: &ExtractedFields,
        options: &ImportOptions,
    ) -> ParentInfo {
        let title = fields.get("product_name").unwrap_or_default();
        let mut info = resolve_parent_info(sku, title);

        // Explicit overrides beat both the sheet and SKU inference.
        if let Some(parent_sku) = fields.get("parent_sku") {
            info.parent_sku = parent_sku.to_string();
        }
        if let Some(parent_name) = fields.get("parent_name") {
            info.product_name = parent_name.trim().to_string();
        }
        if let Some(parent_sku) = &options.parent_sku {
            info.parent_sku = parent_sku.clone();
        }
        if let Some(parent_name) = &options.parent_name {
            info.product_name = parent_name.clone();
        }
        info
    }

    async fn skip(&self, result: &mut ImportResult, row: usize, reason: String) {
        debug!(row, "row skipped: {}", reason);
        result.record_outcome(row, &ImportRowOutcome::Skipped(reason.clone()));
        self.event_sender
            .send_or_log(Event::RowSkipped { row, reason })
            .await;
    }

    async fn finish(&self, result: &ImportResult) {
        if result.has_systemic_failure() {
            warn!(
                errors = result.errors.len(),
                "no rows imported; the column mapping is probably wrong"
            );
        }
        info!(
            created_products = result.created_products,
            updated_products = result.updated_products,
            created_variants = result.created_variants,
            updated_variants = result.updated_variants,
            skipped = result.skipped_rows,
            "import run complete"
        );
        self.event_sender
            .send_or_log(Event::ImportCompleted {
                created_products: result.created_products,
                updated_products: result.updated_products,
                created_variants: result.created_variants,
                updated_variants: result.updated_variants,
                skipped_rows: result.skipped_rows,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_freshness() {
        let heartbeat = Heartbeat::new();
        assert!(!heartbeat.is_stale(Duration::from_secs(60)));
        assert!(heartbeat.is_stale(Duration::from_nanos(1)));
        heartbeat.beat();
        assert!(!heartbeat.is_stale(Duration::from_secs(60)));
    }
}
