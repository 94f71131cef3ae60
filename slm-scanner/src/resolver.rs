//! Product resolution pipeline
//!
//! Given a scan code, produce a product record by trying in order:
//! 1. the local cache
//! 2. web search + language model extraction
//! 3. the first search title, cut at `" - "`
//! 4. a placeholder naming the raw code
//!
//! Codes whose shape makes a web search pointless bail out before searching.
//! Anything resolved through search is written back to the cache, and any
//! placeholder already on the shopping list for the same code is renamed.

use slm_common::{CategoryOrdering, ProductRecord, ScanCode};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{CacheError, CacheStore, ProductCache};
use crate::extraction::guess_product_details;
use crate::shopping_list::ShoppingList;
use crate::types::{ClientError, CompletionProvider, SearchProvider};

/// EAN-13 has 13 digits and UPC-A 12; anything under this is store-internal
pub const MIN_GLOBAL_CODE_LEN: usize = 10;

/// Separator between product name and shop name in search titles
const TITLE_SEPARATOR: &str = " - ";

/// Why a code was not worth searching for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BailOutReason {
    /// GS1 prefix 2 is reserved for store-internal numbering
    StoreInternalPrefix,
    /// The code is a URL the cache does not know
    UrlCode,
    /// Too short to be a globally unique barcode
    TooShort(usize),
}

impl fmt::Display for BailOutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BailOutReason::StoreInternalPrefix => {
                write!(f, "barcode begins with 2 which implies store-internal barcode")
            }
            BailOutReason::UrlCode => write!(f, "barcode encodes an (unrecognized) URL"),
            BailOutReason::TooShort(len) => write!(
                f,
                "length of barcode so short ({}) it implies store-internal barcode",
                len
            ),
        }
    }
}

/// Resolution failures
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0} - bailing out")]
    BailOut(BailOutReason),

    #[error("no web search results for barcode '{0}'")]
    NoSearchResults(ScanCode),

    #[error("web search failed: {0}")]
    Search(#[source] ClientError),

    /// Neither the assistant nor the first search title gave a name
    #[error("no usable product name in web search results for barcode '{0}'")]
    NoUsableName(ScanCode),

    #[error("product name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Cache was updated but the shopping list still shows the placeholder
    #[error("cached '{name}' for {code} but renaming its placeholder failed: {source}")]
    PlaceholderRename {
        code: ScanCode,
        name: String,
        #[source]
        source: ClientError,
    },
}

/// Which step of the pipeline produced a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    Cache,
    Assistant,
    /// First search result title
    Heuristic,
    /// Nothing worked; the record is a placeholder
    Placeholder,
}

/// A resolved record and where it came from
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: ProductRecord,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn is_placeholder(&self) -> bool {
        self.source == ResolutionSource::Placeholder
    }
}

/// Check code shape before spending a search query on it
///
/// <https://en.wikipedia.org/wiki/List_of_GS1_country_codes>
pub fn bail_out_reason(code: &ScanCode) -> Option<BailOutReason> {
    let code_str = code.as_str();

    if code_str.starts_with('2') {
        return Some(BailOutReason::StoreInternalPrefix);
    }

    if code_str.starts_with("https:") || code_str.starts_with("http:") {
        return Some(BailOutReason::UrlCode);
    }

    // Short store-internal codes (like Lidl's) are ambiguous: searching one
    // for a toast once returned a wedding ring.
    let len = code.len();
    if len < MIN_GLOBAL_CODE_LEN {
        return Some(BailOutReason::TooShort(len));
    }

    None
}

/// Name guess from the first search title
pub fn heuristic_name(first_title: &str) -> String {
    first_title
        .split(TITLE_SEPARATOR)
        .next()
        .unwrap_or(first_title)
        .trim()
        .to_string()
}

/// Resolves scan codes to product records
pub struct ProductResolver {
    search: Arc<dyn SearchProvider>,
    assistant: Arc<dyn CompletionProvider>,
    shopping_list: Arc<ShoppingList>,
    store: CacheStore,
    categories: CategoryOrdering,
}

impl ProductResolver {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        assistant: Arc<dyn CompletionProvider>,
        shopping_list: Arc<ShoppingList>,
        store: CacheStore,
        categories: CategoryOrdering,
    ) -> Self {
        Self {
            search,
            assistant,
            shopping_list,
            store,
            categories,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Resolve a code, reporting why resolution failed
    ///
    /// On a cache hit the stored record is returned unchanged; touching
    /// last-seen is up to the caller.
    pub async fn resolve(
        &self,
        code: &ScanCode,
        cache: &ProductCache,
    ) -> Result<Resolution, ResolveError> {
        if let Some(product) = cache.lookup(code) {
            tracing::debug!(code = %code, name = %product.name, "Cache hit");
            return Ok(Resolution {
                record: product.clone(),
                source: ResolutionSource::Cache,
            });
        }
        tracing::info!(code = %code, "Not in cache, continuing with web search");

        if let Some(reason) = bail_out_reason(code) {
            return Err(ResolveError::BailOut(reason));
        }

        let hits = self
            .search
            .search(code.as_str())
            .await
            .map_err(ResolveError::Search)?;

        // Extraction needs at least one result
        let Some(top) = hits.first() else {
            return Err(ResolveError::NoSearchResults(code.clone()));
        };

        let titles: Vec<String> = hits.iter().map(|hit| hit.title.clone()).collect();
        let link = top.link.clone();

        let guessed =
            guess_product_details(self.assistant.as_ref(), &self.categories, &titles, &link).await;

        let resolution = match guessed {
            Ok(record) => Resolution {
                record,
                source: ResolutionSource::Assistant,
            },
            Err(e) => {
                let guess = heuristic_name(&titles[0]);
                if guess.is_empty() {
                    tracing::warn!(error = %e, title = %titles[0], "Assistant failed and first search title has no name");
                    return Err(ResolveError::NoUsableName(code.clone()));
                }
                tracing::warn!(
                    error = %e,
                    fallback = %guess,
                    "Assistant guess of product details failed; falling back to first search result"
                );
                Resolution {
                    record: ProductRecord::new(guess, link),
                    source: ResolutionSource::Heuristic,
                }
            }
        };

        // Not critical here: the caller already has a usable record
        if let Err(e) = self.remember(code, &resolution.record).await {
            tracing::error!(code = %code, error = %e, "Back-fill after resolution failed");
        }

        Ok(resolution)
    }

    /// Resolve a code, degrading to a placeholder instead of failing
    pub async fn resolve_or_placeholder(&self, code: &ScanCode, cache: &ProductCache) -> Resolution {
        match self.resolve(code, cache).await {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "Unable to resolve, using placeholder");
                Resolution {
                    record: ProductRecord::placeholder(code),
                    source: ResolutionSource::Placeholder,
                }
            }
        }
    }

    /// Store a record for a code and rename its placeholder entries
    ///
    /// Used for back-fill after a search and for manual corrections. The cache
    /// is written first; if the rename then fails, cache and shopping list
    /// disagree until the next correction of the same code.
    pub async fn remember(&self, code: &ScanCode, product: &ProductRecord) -> Result<(), ResolveError> {
        if !product.is_resolved() {
            return Err(ResolveError::EmptyName);
        }

        let mut cache = self.store.load()?;
        cache.upsert(code.clone(), product.clone());
        self.store.save(&cache)?;

        tracing::info!(code = %code, name = %product.name, "Product remembered");

        if let Err(source) = self.shopping_list.rename_placeholders(code, &product.name).await {
            tracing::error!(
                code = %code,
                name = %product.name,
                error = %source,
                "Cache and shopping list diverged: placeholder rename failed after cache update"
            );
            return Err(ResolveError::PlaceholderRename {
                code: code.clone(),
                name: product.name.clone(),
                source,
            });
        }

        Ok(())
    }
}
