mod provider;
mod semantic;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::app::App;
use crate::catalog::{AuthorCreate, Book, BookCreate, CategoryCreate};
use crate::config::{CatalogBackendKind, Config};
use crate::semantic::{EmbeddingError, EmbeddingProvider};

/// One dimension per topic word plus a constant bias dimension.
const MOCK_TOPICS: [&str; 8] = [
    "database",
    "distributed",
    "algorithm",
    "programming",
    "network",
    "learning",
    "compiler",
    "security",
];

/// Deterministic keyword embedder that counts its calls.
#[derive(Default)]
pub struct MockProvider {
    calls: AtomicUsize,
    /// Fail with HTTP 500 on this call number (1-based)
    fail_on_call: Option<usize>,
}

impl MockProvider {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let mut vector: Vec<f32> = MOCK_TOPICS
            .iter()
            .map(|topic| text.matches(topic).count() as f32)
            .collect();
        vector.push(1.0);
        vector
    }
}

impl EmbeddingProvider for MockProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(EmbeddingError::Provider {
                provider: "mock",
                status: 500,
                body: "boom".to_string(),
                attempts: 1,
                max_attempts: 1,
            });
        }
        Ok(Self::vector(text))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Creates an isolated App in a unique temp directory with a mock provider.
pub fn create_app() -> (App, Arc<MockProvider>, tempfile::TempDir) {
    create_app_with(CatalogBackendKind::Csv, MockProvider::default())
}

pub fn create_app_with(
    backend: CatalogBackendKind,
    provider: MockProvider,
) -> (App, Arc<MockProvider>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");

    let mut config = Config::load_with(tmp.path()).expect("failed to load config");
    config.catalog.backend = backend;

    let provider = Arc::new(provider);
    let app = App::with_provider(config, provider.clone()).expect("failed to create app");
    (app, provider, tmp)
}

/// Adds an author, a category and one book per `(title, description)`.
pub fn add_books(app: &App, books: &[(&str, &str)]) -> Vec<Book> {
    let author = app
        .create_author(AuthorCreate {
            name: "Martin Kleppmann".to_string(),
            ..Default::default()
        })
        .unwrap();
    let category = app
        .create_category(CategoryCreate {
            name: format!("Category {}", crate::eid::Eid::new()),
            ..Default::default()
        })
        .unwrap();

    books
        .iter()
        .enumerate()
        .map(|(i, (title, description))| {
            let view = app
                .create_book(BookCreate {
                    title: title.to_string(),
                    isbn: format!("978-3-{}-{i}", category.id),
                    description: Some(description.to_string()),
                    price: 20.0 + i as f64,
                    stock_quantity: 5,
                    author_id: author.id.clone(),
                    category_id: category.id.clone(),
                    ..Default::default()
                })
                .unwrap();
            app.catalog.book(&view.id).unwrap()
        })
        .collect()
}
