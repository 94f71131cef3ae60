//! Shared test helpers: in-memory collaborators and a wired scan service

#![allow(dead_code)]

use async_trait::async_trait;
use slm_common::CategoryOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use slm_scanner::cache::CacheStore;
use slm_scanner::resolver::ProductResolver;
use slm_scanner::scan::ScanService;
use slm_scanner::shopping_list::ShoppingList;
use slm_scanner::types::{
    ClientError, Completion, CompletionProvider, NewTask, SearchHit, SearchProvider, Task, TaskList,
};

pub const PROJECT_ID: &str = "shopping";
pub const BASE_URL: &str = "https://home.example.com";

/// Search engine returning canned hits
#[derive(Default)]
pub struct MockSearch {
    hits: Mutex<Vec<SearchHit>>,
    pub calls: AtomicUsize,
}

impl MockSearch {
    pub fn with_titles(titles: &[&str]) -> Self {
        let hits = titles
            .iter()
            .enumerate()
            .map(|(i, title)| SearchHit {
                title: title.to_string(),
                link: format!("https://shop.example.com/{}", i),
            })
            .collect();
        Self {
            hits: Mutex::new(hits),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.lock().unwrap().clone())
    }
}

/// Language model with a fixed reply, or failing when none is set
#[derive(Default)]
pub struct MockAssistant {
    answer: Option<String>,
    pub calls: AtomicUsize,
}

impl MockAssistant {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockAssistant {
    async fn complete(&self, _prompt: &str) -> Result<Completion, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Some(answer) => Ok(Completion::Text(answer.clone())),
            None => Err(ClientError::Api(503, "overloaded".to_string())),
        }
    }
}

/// In-memory task list
#[derive(Default)]
pub struct MockTaskList {
    pub tasks: Mutex<Vec<Task>>,
    pub created: Mutex<Vec<NewTask>>,
    pub fail_updates: bool,
    next_id: AtomicUsize,
}

impl MockTaskList {
    pub fn failing_updates() -> Self {
        Self {
            fail_updates: true,
            ..Default::default()
        }
    }

    pub fn push(&self, content: &str) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().unwrap().push(Task {
            id: format!("task-{}", id),
            content: content.to_string(),
            order: 0,
        });
    }

    pub fn contents(&self) -> Vec<String> {
        self.tasks.lock().unwrap().iter().map(|t| t.content.clone()).collect()
    }
}

#[async_trait]
impl TaskList for MockTaskList {
    async fn list_tasks(&self, _project_id: &str) -> Result<Vec<Task>, ClientError> {
        let mut tasks = self.tasks.lock().unwrap().clone();
        tasks.sort_by_key(|t| t.order);
        Ok(tasks)
    }

    async fn create_task(&self, task: NewTask) -> Result<(), ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().unwrap().push(Task {
            id: format!("task-{}", id),
            content: task.content.clone(),
            order: task.order,
        });
        self.created.lock().unwrap().push(task);
        Ok(())
    }

    async fn update_task(&self, id: &str, content: &str) -> Result<(), ClientError> {
        if self.fail_updates {
            return Err(ClientError::Network("connection reset".to_string()));
        }
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.content = content.to_string();
                Ok(())
            }
            None => Err(ClientError::Api(404, format!("no task {}", id))),
        }
    }
}

/// Scan service over mocks and a cache file in a temp dir
pub struct Harness {
    pub dir: TempDir,
    pub store: CacheStore,
    pub search: Arc<MockSearch>,
    pub assistant: Arc<MockAssistant>,
    pub tasks: Arc<MockTaskList>,
    pub shopping_list: Arc<ShoppingList>,
    pub service: Arc<ScanService>,
}

impl Harness {
    pub fn new(search: MockSearch, assistant: MockAssistant, tasks: MockTaskList) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("barcode-db.json"));
        let search = Arc::new(search);
        let assistant = Arc::new(assistant);
        let tasks = Arc::new(tasks);
        let categories = CategoryOrdering::standard();

        let shopping_list = Arc::new(ShoppingList::new(
            tasks.clone(),
            PROJECT_ID,
            categories,
            BASE_URL,
        ));
        let resolver = ProductResolver::new(
            search.clone(),
            assistant.clone(),
            shopping_list.clone(),
            store.clone(),
            categories,
        );
        let service = Arc::new(ScanService::new(resolver, shopping_list.clone()));

        Self {
            dir,
            store,
            search,
            assistant,
            tasks,
            shopping_list,
            service,
        }
    }

    /// Resolver sharing this harness's collaborators and cache file
    pub fn resolver(&self) -> ProductResolver {
        ProductResolver::new(
            self.search.clone(),
            self.assistant.clone(),
            self.shopping_list.clone(),
            self.store.clone(),
            CategoryOrdering::standard(),
        )
    }

    /// No search results, failing assistant, empty list
    pub fn offline() -> Self {
        Self::new(MockSearch::default(), MockAssistant::failing(), MockTaskList::default())
    }
}
