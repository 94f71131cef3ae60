//! Product details from web search titles via a language model
//!
//! The model is asked to answer in a fixed line format. Its reply is free text,
//! so each field is matched on its own and any of them may be missing.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use slm_common::{CategoryOrdering, ProductRecord};
use thiserror::Error;

use crate::types::{ClientError, Completion, CompletionProvider};

const PROMPT_TEMPLATE: &str = r#"I have list of web search result page titles (one per line), try to guess what is the product name (usually it's a grocery store item, but not always):

```
{titles}
```

If search results are in multiple languages, prefer Finnish and then English.

This will be variable *ProductName*. It may or may not be in Finnish.

I want also to resolve product type (*ProductType*) and product category (*ProductCategory*) for the product name. Product type example is just "Milk" and product category is one of these rigid options:

- {categories}

Please respond succinctly in this format:

```
Product name: <ProductName>
Product type: <ProductType>
Product category: <ProductCategory>
Notes: <notes if you have any additional notes, for example if you're unsure of some detail>
```

For the category if you're unsure choose "Other" and include in notes why you're unsure.
"#;

static PRODUCT_NAME_RE: Lazy<Regex> = Lazy::new(|| field_regex("Product name"));
static PRODUCT_TYPE_RE: Lazy<Regex> = Lazy::new(|| field_regex("Product type"));
static PRODUCT_CATEGORY_RE: Lazy<Regex> = Lazy::new(|| field_regex("Product category"));
static NOTES_RE: Lazy<Regex> = Lazy::new(|| field_regex("Notes"));

fn field_regex(prefix: &str) -> Regex {
    Regex::new(&format!(r"{}: ([^\n]+)", regex::escape(prefix))).expect("valid field regex")
}

/// Extraction failures; any of these sends the resolver to its heuristic
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("assistant request failed: {0}")]
    Assistant(#[from] ClientError),

    #[error("assistant refused, reason: {0}")]
    Refused(String),

    #[error("assistant failed to resolve product name. notes: {notes}")]
    MissingName { notes: String },
}

/// Fields parsed from an assistant reply; each is absent when its line is missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDetails {
    pub name: Option<String>,
    pub product_type: Option<String>,
    pub product_category: Option<String>,
    pub notes: Option<String>,
}

impl ExtractedDetails {
    /// Parse a free-form reply
    pub fn parse(answer: &str) -> Self {
        let resolve = |re: &Regex| {
            re.captures(answer)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            name: resolve(&PRODUCT_NAME_RE),
            product_type: resolve(&PRODUCT_TYPE_RE),
            product_category: resolve(&PRODUCT_CATEGORY_RE),
            notes: resolve(&NOTES_RE),
        }
    }

    /// Turn into a record, failing if no name was given
    pub fn into_record(self, link: &str) -> Result<ProductRecord, ExtractionError> {
        let name = match self.name {
            Some(name) => name,
            None => {
                return Err(ExtractionError::MissingName {
                    notes: self.notes.unwrap_or_default(),
                })
            }
        };

        let now = Utc::now();
        Ok(ProductRecord {
            name,
            product_type: self.product_type.unwrap_or_default(),
            product_category: self.product_category.unwrap_or_default(),
            link: link.to_string(),
            notes: self.notes.unwrap_or_default(),
            first_scanned: Some(now),
            last_scanned: Some(now),
        })
    }
}

/// Build the prompt for a list of search result titles
pub fn make_prompt(titles: &[String], categories: &CategoryOrdering) -> String {
    let labels: Vec<&str> = categories.labels().collect();

    PROMPT_TEMPLATE
        .replace("{categories}", &labels.join("\n- "))
        .replace("{titles}", &titles.join("\n"))
}

/// Ask the assistant to name the product behind a set of search results
pub async fn guess_product_details(
    assistant: &dyn CompletionProvider,
    categories: &CategoryOrdering,
    titles: &[String],
    link: &str,
) -> Result<ProductRecord, ExtractionError> {
    let prompt = make_prompt(titles, categories);

    let answer = match assistant.complete(&prompt).await? {
        Completion::Text(text) => text,
        Completion::Refused(reason) => return Err(ExtractionError::Refused(reason)),
    };

    let details = ExtractedDetails::parse(&answer);

    if let Some(category) = &details.product_category {
        if categories.position(category).is_none() {
            tracing::warn!(category = %category, "Assistant answered with a category outside the fixed list");
        }
    }

    let record = details.into_record(link)?;

    tracing::debug!(
        name = %record.name,
        product_type = %record.product_type,
        product_category = %record.product_category,
        "Assistant guessed product details"
    );

    Ok(record)
}
