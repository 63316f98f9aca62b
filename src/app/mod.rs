//! Application facade shared by the HTTP daemon and the CLI.

pub mod errors;

use std::sync::Arc;

pub use errors::AppError;

use crate::{
    catalog::{
        self, contains_ignore_case, Author, AuthorCreate, AuthorFilter, BookCreate, BookQuery,
        BookView, CatalogCounts, CatalogManager, Category, CategoryCreate, CategoryFilter, Page,
        PageRequest,
    },
    config::Config,
    seed::{self, SeedReport},
    semantic::{
        provider_from_config, EmbeddingProvider, RecomputeReport, ScoredResult, SemanticService,
    },
};

pub struct App {
    config: Config,
    pub catalog: Arc<dyn CatalogManager>,
    semantic: SemanticService,
}

impl App {
    /// Opens the catalog and builds the configured embedding provider.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let provider = provider_from_config(&config.embedding)?;
        Self::with_provider(config, provider)
    }

    pub fn with_provider(
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, AppError> {
        let catalog: Arc<dyn CatalogManager> =
            catalog::open(config.base_path(), config.catalog.backend)?;
        let semantic = SemanticService::new(catalog.clone(), provider);

        Ok(Self {
            config,
            catalog,
            semantic,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn authors(&self, filter: &AuthorFilter, page: &PageRequest) -> Result<Page<Author>, AppError> {
        let mut authors = self.catalog.authors()?;
        authors.retain(|a| filter.matches(a));
        Ok(page.apply(authors)?)
    }

    /// Authors whose name contains `name`, ignoring case.
    pub fn search_authors(&self, name: &str) -> Result<Vec<Author>, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        let mut authors = self.catalog.authors()?;
        authors.retain(|a| contains_ignore_case(&a.name, name));
        Ok(authors)
    }

    /// Distinct author nationalities, sorted.
    pub fn nationalities(&self) -> Result<Vec<String>, AppError> {
        let mut nationalities: Vec<String> = self
            .catalog
            .authors()?
            .into_iter()
            .filter_map(|a| a.nationality)
            .collect();
        nationalities.sort();
        nationalities.dedup();
        Ok(nationalities)
    }

    pub fn author(&self, id: &str) -> Result<Author, AppError> {
        Ok(self.catalog.author(id)?)
    }

    pub fn create_author(&self, create: AuthorCreate) -> Result<Author, AppError> {
        let author = self.catalog.create_author(create)?;
        log::info!("created author {} ({})", author.id, author.name);
        Ok(author)
    }

    pub fn update_author(&self, id: &str, update: AuthorCreate) -> Result<Author, AppError> {
        Ok(self.catalog.update_author(id, update)?)
    }

    pub fn delete_author(&self, id: &str) -> Result<(), AppError> {
        self.catalog.delete_author(id)?;
        log::info!("deleted author {id}");
        Ok(())
    }

    pub fn author_books(&self, id: &str) -> Result<Vec<BookView>, AppError> {
        let author = self.catalog.author(id)?;
        let query = BookQuery {
            author_id: Some(author.id),
            ..Default::default()
        };
        self.book_list(&query)
    }

    pub fn categories(
        &self,
        filter: &CategoryFilter,
        page: &PageRequest,
    ) -> Result<Page<Category>, AppError> {
        let mut categories = self.catalog.categories()?;
        categories.retain(|c| filter.matches(c));
        Ok(page.apply(categories)?)
    }

    /// Categories whose name contains `name`, ignoring case.
    pub fn search_categories(&self, name: &str) -> Result<Vec<Category>, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        let mut categories = self.catalog.categories()?;
        categories.retain(|c| contains_ignore_case(&c.name, name));
        Ok(categories)
    }

    pub fn category(&self, id: &str) -> Result<Category, AppError> {
        Ok(self.catalog.category(id)?)
    }

    pub fn create_category(&self, create: CategoryCreate) -> Result<Category, AppError> {
        let category = self.catalog.create_category(create)?;
        log::info!("created category {} ({})", category.id, category.name);
        Ok(category)
    }

    pub fn update_category(&self, id: &str, update: CategoryCreate) -> Result<Category, AppError> {
        Ok(self.catalog.update_category(id, update)?)
    }

    pub fn delete_category(&self, id: &str) -> Result<(), AppError> {
        self.catalog.delete_category(id)?;
        log::info!("deleted category {id}");
        Ok(())
    }

    pub fn category_books(&self, id: &str) -> Result<Vec<BookView>, AppError> {
        let category = self.catalog.category(id)?;
        let query = BookQuery {
            category_id: Some(category.id),
            ..Default::default()
        };
        self.book_list(&query)
    }

    pub fn search_books(&self, query: &BookQuery) -> Result<Page<BookView>, AppError> {
        let Page {
            content,
            page,
            size,
            total_elements,
            total_pages,
        } = self.catalog.search_books(query)?;

        Ok(Page {
            content: catalog::book_views(self.catalog.as_ref(), content)?,
            page,
            size,
            total_elements,
            total_pages,
        })
    }

    pub fn book(&self, id: &str) -> Result<BookView, AppError> {
        let book = self.catalog.book(id)?;
        Ok(catalog::book_view(self.catalog.as_ref(), book)?)
    }

    pub fn book_by_isbn(&self, isbn: &str) -> Result<BookView, AppError> {
        let book = self.catalog.book_by_isbn(isbn)?;
        Ok(catalog::book_view(self.catalog.as_ref(), book)?)
    }

    pub fn create_book(&self, create: BookCreate) -> Result<BookView, AppError> {
        let book = self.catalog.create_book(create)?;
        log::info!("created book {} ({})", book.id, book.isbn);
        Ok(catalog::book_view(self.catalog.as_ref(), book)?)
    }

    pub fn update_book(&self, id: &str, update: BookCreate) -> Result<BookView, AppError> {
        let book = self.catalog.update_book(id, update)?;
        Ok(catalog::book_view(self.catalog.as_ref(), book)?)
    }

    pub fn update_stock(&self, id: &str, stock_quantity: i32) -> Result<BookView, AppError> {
        let book = self.catalog.update_stock(id, stock_quantity)?;
        Ok(catalog::book_view(self.catalog.as_ref(), book)?)
    }

    pub fn delete_book(&self, id: &str) -> Result<(), AppError> {
        self.catalog.delete_book(id)?;
        log::info!("deleted book {id}");
        Ok(())
    }

    /// Books with stock at or below `threshold`.
    pub fn low_stock(&self, threshold: i32) -> Result<Vec<BookView>, AppError> {
        let query = BookQuery {
            max_stock: Some(threshold),
            ..Default::default()
        };
        self.book_list(&query)
    }

    pub fn recompute_embeddings(&self, force: bool) -> Result<RecomputeReport, AppError> {
        Ok(self.semantic.recompute_all(force)?)
    }

    pub fn compute_embedding(&self, id: &str) -> Result<BookView, AppError> {
        let book = self.semantic.compute_for_book(id)?;
        Ok(catalog::book_view(self.catalog.as_ref(), book)?)
    }

    pub fn recommend(&self, id: &str, limit: usize) -> Result<Vec<ScoredResult>, AppError> {
        Ok(self.semantic.recommend_by_book(id, limit)?)
    }

    pub fn semantic_search(&self, query: &str, limit: usize) -> Result<Vec<ScoredResult>, AppError> {
        Ok(self.semantic.semantic_search(query, limit)?)
    }

    pub fn seed_if_empty(&self) -> Result<Option<CatalogCounts>, AppError> {
        Ok(seed::seed_if_empty(self.catalog.as_ref())?)
    }

    pub fn seed_ten_books(&self) -> Result<SeedReport, AppError> {
        Ok(seed::seed_ten_books(self.catalog.as_ref())?)
    }

    pub fn stats(&self) -> Result<CatalogCounts, AppError> {
        Ok(self.catalog.counts()?)
    }

    pub fn provider_name(&self) -> &'static str {
        self.semantic.provider_name()
    }

    fn book_list(&self, query: &BookQuery) -> Result<Vec<BookView>, AppError> {
        let books = self.catalog.filter_books(query)?;
        Ok(catalog::book_views(self.catalog.as_ref(), books)?)
    }
}
