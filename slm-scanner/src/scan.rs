//! Scan handling
//!
//! Ties resolution, caching and publishing together for one scan, and turns the
//! result into a sentence for the person at the scanner.

use chrono::Utc;
use slm_common::{CategoryOrdering, ProductRecord, ScanCode};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::cache::{CacheError, ProductCache};
use crate::resolver::{ProductResolver, Resolution, ResolutionSource, ResolveError};
use crate::shopping_list::{ShoppingList, ShoppingListError};
use crate::types::ClientError;

/// Scan handling errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("item already on the shopping list: {0}")]
    AlreadyOnList(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("shopping list: {0}")]
    TaskList(#[from] ClientError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl From<ShoppingListError> for ScanError {
    fn from(e: ShoppingListError) -> Self {
        match e {
            ShoppingListError::AlreadyOnList(name) => ScanError::AlreadyOnList(name),
            ShoppingListError::TaskList(e) => ScanError::TaskList(e),
        }
    }
}

/// What a handled scan put on the shopping list
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub code: ScanCode,
    pub record: ProductRecord,
    pub source: ResolutionSource,
}

impl ScanOutcome {
    pub fn is_placeholder(&self) -> bool {
        self.source == ResolutionSource::Placeholder
    }
}

/// Handles scans and manual corrections
pub struct ScanService {
    resolver: ProductResolver,
    shopping_list: Arc<ShoppingList>,
    last_error: Arc<RwLock<Option<String>>>,
}

impl ScanService {
    pub fn new(resolver: ProductResolver, shopping_list: Arc<ShoppingList>) -> Self {
        Self {
            resolver,
            shopping_list,
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn categories(&self) -> &CategoryOrdering {
        self.shopping_list.categories()
    }

    /// Most recent scan failure, for diagnostics
    pub fn last_error(&self) -> Arc<RwLock<Option<String>>> {
        Arc::clone(&self.last_error)
    }

    /// Fresh snapshot of the product cache
    pub fn load_cache(&self) -> Result<ProductCache, CacheError> {
        self.resolver.store().load()
    }

    /// Resolve a scanned code and put it on the shopping list
    pub async fn handle_scan(&self, code: &ScanCode) -> Result<ScanOutcome, ScanError> {
        let result = self.handle_scan_inner(code).await;

        if let Err(e) = &result {
            if !matches!(e, ScanError::AlreadyOnList(_)) {
                *self.last_error.write().await = Some(format!("{}: {}", code, e));
            }
        }

        result
    }

    async fn handle_scan_inner(&self, code: &ScanCode) -> Result<ScanOutcome, ScanError> {
        tracing::info!(code = %code, "Handling scan");

        let mut cache = self.load_cache()?;
        let mut resolution = self.resolver.resolve_or_placeholder(code, &cache).await;

        // A nameless record (e.g. hand-edited cache file) is never stored or published
        if !resolution.record.is_resolved() {
            tracing::warn!(code = %code, source = ?resolution.source, "Resolved record has no name, using placeholder");
            resolution = Resolution {
                record: ProductRecord::placeholder(code),
                source: ResolutionSource::Placeholder,
            };
        }

        // Placeholders stay out of the cache so the next scan tries again
        if !resolution.is_placeholder() {
            resolution.record.touch(Utc::now());
            cache.upsert(code.clone(), resolution.record.clone());
            self.resolver.store().save(&cache)?;
        }

        self.shopping_list.add_product(code, &resolution.record).await?;

        tracing::info!(
            code = %code,
            name = %resolution.record.name,
            source = ?resolution.source,
            "Added to shopping list"
        );

        Ok(ScanOutcome {
            code: code.clone(),
            record: resolution.record,
            source: resolution.source,
        })
    }

    /// Store a manually corrected record and rename its placeholder entries
    pub async fn record_correction(&self, code: &ScanCode, record: &ProductRecord) -> Result<(), ScanError> {
        if !record.is_resolved() {
            return Err(ScanError::InvalidInput("product name must not be empty".to_string()));
        }

        self.resolver.remember(code, record).await?;
        Ok(())
    }

    /// Codes of the placeholder entries on the shopping list
    pub async fn list_misses(&self) -> Result<Vec<ScanCode>, ScanError> {
        Ok(self.shopping_list.list_misses().await?)
    }
}

/// Sentence telling the user what happened to a scan
pub fn feedback_message(result: &Result<ScanOutcome, ScanError>) -> String {
    match result {
        Err(ScanError::AlreadyOnList(_)) => {
            "Item not added because it was already on the shopping list".to_string()
        }
        Err(_) => "Error handling scanned barcode".to_string(),
        Ok(outcome) if outcome.is_placeholder() => "Item added but name is unrecognized".to_string(),
        Ok(outcome) if !outcome.record.product_type.is_empty() => {
            format!("Added {}", outcome.record.product_type)
        }
        Ok(_) => "Item added".to_string(),
    }
}
