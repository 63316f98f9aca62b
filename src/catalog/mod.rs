//! Bookstore catalog: authors, categories and books.
//!
//! `Catalog` keeps all three tables in memory and writes them through a
//! `CatalogBackend` after every mutation. Two backends share the same query
//! semantics:
//!
//! - `BackendCsv`: one CSV table per entity
//! - `BackendJson`: a single JSON document holding every collection

mod backend_csv;
mod backend_json;
mod store;
pub mod types;
pub mod validation;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use backend_csv::BackendCsv;
pub use backend_json::BackendJson;
pub use store::{Catalog, Tables};
pub use types::*;

use crate::{config::CatalogBackendKind, eid::Eid};

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Persistence for the whole table set.
pub trait CatalogBackend: Send + Sync {
    fn load(&self) -> Result<Tables>;
    fn save(&self, tables: &Tables) -> Result<()>;
}

pub trait CatalogManager: Send + Sync {
    fn authors(&self) -> Result<Vec<Author>>;
    fn author(&self, id: &str) -> Result<Author>;
    fn find_author_by_name(&self, name: &str) -> Result<Option<Author>>;
    fn create_author(&self, create: AuthorCreate) -> Result<Author>;
    fn update_author(&self, id: &str, update: AuthorCreate) -> Result<Author>;
    fn delete_author(&self, id: &str) -> Result<()>;

    fn categories(&self) -> Result<Vec<Category>>;
    fn category(&self, id: &str) -> Result<Category>;
    fn find_category_by_name(&self, name: &str) -> Result<Option<Category>>;
    fn create_category(&self, create: CategoryCreate) -> Result<Category>;
    fn update_category(&self, id: &str, update: CategoryCreate) -> Result<Category>;
    fn delete_category(&self, id: &str) -> Result<()>;

    fn books(&self) -> Result<Vec<Book>>;
    fn book(&self, id: &str) -> Result<Book>;
    fn book_by_isbn(&self, isbn: &str) -> Result<Book>;
    fn create_book(&self, create: BookCreate) -> Result<Book>;
    fn update_book(&self, id: &str, update: BookCreate) -> Result<Book>;
    fn update_stock(&self, id: &str, stock_quantity: i32) -> Result<Book>;
    fn delete_book(&self, id: &str) -> Result<()>;
    /// Replaces only the vector and its timestamp. A book deleted in the
    /// meantime stays deleted and yields `NotFound`.
    fn set_embedding(
        &self,
        id: &str,
        embedding: Vec<f32>,
        computed_at: DateTime<Utc>,
    ) -> Result<Book>;
    /// Every book matching the filters, in insertion order.
    fn filter_books(&self, query: &BookQuery) -> Result<Vec<Book>>;
    fn search_books(&self, query: &BookQuery) -> Result<Page<Book>>;

    fn counts(&self) -> Result<CatalogCounts>;
}

/// Opens the catalog under `base_path` with the configured backend.
pub fn open(base_path: &Path, kind: CatalogBackendKind) -> Result<Arc<Catalog>> {
    let dir = base_path.join("catalog");
    let backend: Box<dyn CatalogBackend> = match kind {
        CatalogBackendKind::Csv => Box::new(BackendCsv::new(&dir)?),
        CatalogBackendKind::Json => Box::new(BackendJson::new(&dir)?),
    };
    log::info!("opening {kind:?} catalog at {}", dir.display());
    Ok(Arc::new(Catalog::load(backend)?))
}

/// Resolves author and category names for a batch of books.
pub fn book_views(catalog: &dyn CatalogManager, books: Vec<Book>) -> Result<Vec<BookView>> {
    let authors: HashMap<Eid, String> = catalog
        .authors()?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    let categories: HashMap<Eid, String> = catalog
        .categories()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    Ok(books
        .into_iter()
        .map(|book| {
            let author_name = authors.get(&book.author_id).cloned();
            let category_name = categories.get(&book.category_id).cloned();
            BookView::new(book, author_name, category_name)
        })
        .collect())
}

pub fn book_view(catalog: &dyn CatalogManager, book: Book) -> Result<BookView> {
    let author_name = optional(catalog.author(&book.author_id))?.map(|a| a.name);
    let category_name = optional(catalog.category(&book.category_id))?.map(|c| c.name);
    Ok(BookView::new(book, author_name, category_name))
}

/// Turns a `NotFound` into `None`, keeping every other error.
pub fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CatalogError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}
