//! Shopping list publishing
//!
//! Resolved products become tasks in one task-list project. Placement follows
//! the category ordering so the list reads in aisle order. Unresolved scans are
//! published under a placeholder name that is renamed once the product is
//! known.

use slm_common::model::{placeholder_code, placeholder_name};
use slm_common::{CategoryOrdering, ProductRecord, ScanCode};
use std::sync::Arc;
use thiserror::Error;

use crate::types::{ClientError, NewTask, TaskList};

/// Route of the correction UI, also used in task descriptions
pub const APP_HOME_ROUTE: &str = "/shopping-list-manager/";

/// Shopping list errors
#[derive(Debug, Error)]
pub enum ShoppingListError {
    /// An entry with the same name is already on the list
    #[error("requested product name already on the list: {0}")]
    AlreadyOnList(String),

    #[error(transparent)]
    TaskList(#[from] ClientError),
}

/// Publishes products to the shopping list project
pub struct ShoppingList {
    tasks: Arc<dyn TaskList>,
    project_id: String,
    categories: CategoryOrdering,
    webapp_base_url: String,
}

impl ShoppingList {
    pub fn new(
        tasks: Arc<dyn TaskList>,
        project_id: impl Into<String>,
        categories: CategoryOrdering,
        webapp_base_url: impl Into<String>,
    ) -> Self {
        Self {
            tasks,
            project_id: project_id.into(),
            categories,
            webapp_base_url: webapp_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn categories(&self) -> &CategoryOrdering {
        &self.categories
    }

    /// Add a product unless an entry with the exact same name exists
    pub async fn add_product(
        &self,
        code: &ScanCode,
        product: &ProductRecord,
    ) -> Result<(), ShoppingListError> {
        let existing = self.tasks.list_tasks(&self.project_id).await?;

        if existing.iter().any(|t| t.content == product.name) {
            return Err(ShoppingListError::AlreadyOnList(product.name.clone()));
        }

        self.tasks
            .create_task(NewTask {
                content: product.name.clone(),
                description: self.description_markdown(code),
                project_id: self.project_id.clone(),
                order: self.categories.weight(&product.product_category),
            })
            .await?;

        Ok(())
    }

    /// Rename every placeholder entry for `code` to `name`
    ///
    /// Returns how many entries were renamed.
    pub async fn rename_placeholders(&self, code: &ScanCode, name: &str) -> Result<usize, ClientError> {
        let placeholder = placeholder_name(code);
        let existing = self.tasks.list_tasks(&self.project_id).await?;

        let mut renamed = 0;
        for task in existing.iter().filter(|t| t.content == placeholder) {
            self.tasks.update_task(&task.id, name).await?;
            renamed += 1;
        }

        if renamed > 0 {
            tracing::info!(code = %code, name = %name, renamed, "Renamed placeholder entries");
        }
        Ok(renamed)
    }

    /// Codes of the placeholder entries currently on the list, in list order
    pub async fn list_misses(&self) -> Result<Vec<ScanCode>, ClientError> {
        let existing = self.tasks.list_tasks(&self.project_id).await?;
        Ok(existing
            .iter()
            .filter_map(|t| placeholder_code(&t.content))
            .collect())
    }

    /// Task description: a Markdown link to the item's page in the correction UI,
    /// so the code and its details are one click away from the list
    pub fn description_markdown(&self, code: &ScanCode) -> String {
        format!("[Details]({})", self.item_url(code))
    }

    pub fn item_url(&self, code: &ScanCode) -> String {
        format!("{}{}", self.webapp_base_url, item_path(code))
    }
}

/// Path of an item page, with the code percent-encoded as one path segment
pub fn item_path(code: &ScanCode) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(code.as_str().as_bytes()).collect();
    format!("{}item/{}", APP_HOME_ROUTE, encoded.replace('+', "%20"))
}
