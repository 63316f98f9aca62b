use std::sync::{RwLock, RwLockReadGuard};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    types::*,
    validation::{validate_author, validate_book, validate_category, validate_stock},
    CatalogBackend, CatalogError, CatalogManager, Result,
};
use crate::eid::Eid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub books: Vec<Book>,
}

impl Tables {
    fn author_exists(&self, id: &str) -> bool {
        self.authors.iter().any(|a| a.id.as_str() == id)
    }

    fn category_exists(&self, id: &str) -> bool {
        self.categories.iter().any(|c| c.id.as_str() == id)
    }

    fn book_mut(&mut self, id: &str) -> Result<&mut Book> {
        self.books
            .iter_mut()
            .find(|b| b.id.as_str() == id)
            .ok_or_else(|| CatalogError::not_found("book", id))
    }

    fn check_references(&self, create: &BookCreate) -> Result<()> {
        if !self.author_exists(&create.author_id) {
            return Err(CatalogError::not_found("author", create.author_id.as_str()));
        }
        if !self.category_exists(&create.category_id) {
            return Err(CatalogError::not_found("category", create.category_id.as_str()));
        }
        Ok(())
    }

    fn check_isbn_free(&self, isbn: &str, except: Option<&str>) -> Result<()> {
        let taken = self
            .books
            .iter()
            .any(|b| b.isbn == isbn && Some(b.id.as_str()) != except);
        if taken {
            return Err(CatalogError::AlreadyExists(format!(
                "book with ISBN '{isbn}' already exists"
            )));
        }
        Ok(())
    }

    fn check_category_name_free(&self, name: &str, except: Option<&str>) -> Result<()> {
        let name = name.trim().to_lowercase();
        let taken = self
            .categories
            .iter()
            .any(|c| c.name.to_lowercase() == name && Some(c.id.as_str()) != except);
        if taken {
            return Err(CatalogError::AlreadyExists(format!(
                "category '{name}' already exists"
            )));
        }
        Ok(())
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// In-memory catalog persisted through a [`CatalogBackend`].
pub struct Catalog {
    tables: RwLock<Tables>,
    backend: Box<dyn CatalogBackend>,
}

impl Catalog {
    pub fn load(backend: Box<dyn CatalogBackend>) -> Result<Self> {
        let now = std::time::Instant::now();
        let tables = backend.load()?;

        log::debug!(
            "loaded {} authors, {} categories, {} books in {}ms",
            tables.authors.len(),
            tables.categories.len(),
            tables.books.len(),
            now.elapsed().as_micros() as f64 / 1000.0
        );

        Ok(Self {
            tables: RwLock::new(tables),
            backend,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("catalog lock poisoned").into())
    }

    /// Applies `f` to a copy of the tables, persists the copy and only then
    /// swaps it in, so a failed save leaves memory and disk in agreement.
    fn mutate<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;

        let mut next = tables.clone();
        let output = f(&mut next)?;
        self.backend.save(&next)?;
        *tables = next;

        Ok(output)
    }
}

impl CatalogManager for Catalog {
    fn authors(&self) -> Result<Vec<Author>> {
        Ok(self.read()?.authors.clone())
    }

    fn author(&self, id: &str) -> Result<Author> {
        self.read()?
            .authors
            .iter()
            .find(|a| a.id.as_str() == id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("author", id))
    }

    fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        let name = name.trim().to_lowercase();
        Ok(self
            .read()?
            .authors
            .iter()
            .find(|a| a.name.to_lowercase() == name)
            .cloned())
    }

    fn create_author(&self, create: AuthorCreate) -> Result<Author> {
        validate_author(&create)?;

        self.mutate(|tables| {
            let author = Author {
                id: Eid::new(),
                name: create.name.trim().to_string(),
                bio: trimmed(create.bio),
                nationality: trimmed(create.nationality),
            };
            tables.authors.push(author.clone());
            Ok(author)
        })
    }

    fn update_author(&self, id: &str, update: AuthorCreate) -> Result<Author> {
        validate_author(&update)?;

        self.mutate(|tables| {
            let author = tables
                .authors
                .iter_mut()
                .find(|a| a.id.as_str() == id)
                .ok_or_else(|| CatalogError::not_found("author", id))?;

            author.name = update.name.trim().to_string();
            author.bio = trimmed(update.bio);
            author.nationality = trimmed(update.nationality);
            Ok(author.clone())
        })
    }

    fn delete_author(&self, id: &str) -> Result<()> {
        self.mutate(|tables| {
            let idx = tables
                .authors
                .iter()
                .position(|a| a.id.as_str() == id)
                .ok_or_else(|| CatalogError::not_found("author", id))?;

            let referenced = tables.books.iter().filter(|b| b.author_id.as_str() == id).count();
            if referenced > 0 {
                return Err(CatalogError::Conflict(format!(
                    "author {id} is referenced by {referenced} books"
                )));
            }

            tables.authors.remove(idx);
            Ok(())
        })
    }

    fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.read()?.categories.clone())
    }

    fn category(&self, id: &str) -> Result<Category> {
        self.read()?
            .categories
            .iter()
            .find(|c| c.id.as_str() == id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("category", id))
    }

    fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let name = name.trim().to_lowercase();
        Ok(self
            .read()?
            .categories
            .iter()
            .find(|c| c.name.to_lowercase() == name)
            .cloned())
    }

    fn create_category(&self, create: CategoryCreate) -> Result<Category> {
        validate_category(&create)?;

        self.mutate(|tables| {
            tables.check_category_name_free(&create.name, None)?;

            let category = Category {
                id: Eid::new(),
                name: create.name.trim().to_string(),
                description: trimmed(create.description),
            };
            tables.categories.push(category.clone());
            Ok(category)
        })
    }

    fn update_category(&self, id: &str, update: CategoryCreate) -> Result<Category> {
        validate_category(&update)?;

        self.mutate(|tables| {
            tables.check_category_name_free(&update.name, Some(id))?;

            let category = tables
                .categories
                .iter_mut()
                .find(|c| c.id.as_str() == id)
                .ok_or_else(|| CatalogError::not_found("category", id))?;

            category.name = update.name.trim().to_string();
            category.description = trimmed(update.description);
            Ok(category.clone())
        })
    }

    fn delete_category(&self, id: &str) -> Result<()> {
        self.mutate(|tables| {
            let idx = tables
                .categories
                .iter()
                .position(|c| c.id.as_str() == id)
                .ok_or_else(|| CatalogError::not_found("category", id))?;

            let referenced = tables
                .books
                .iter()
                .filter(|b| b.category_id.as_str() == id)
                .count();
            if referenced > 0 {
                return Err(CatalogError::Conflict(format!(
                    "category {id} is referenced by {referenced} books"
                )));
            }

            tables.categories.remove(idx);
            Ok(())
        })
    }

    fn books(&self) -> Result<Vec<Book>> {
        Ok(self.read()?.books.clone())
    }

    fn book(&self, id: &str) -> Result<Book> {
        self.read()?
            .books
            .iter()
            .find(|b| b.id.as_str() == id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("book", id))
    }

    fn book_by_isbn(&self, isbn: &str) -> Result<Book> {
        self.read()?
            .books
            .iter()
            .find(|b| b.isbn == isbn)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("book", format!("isbn {isbn}")))
    }

    fn create_book(&self, create: BookCreate) -> Result<Book> {
        validate_book(&create)?;

        self.mutate(|tables| {
            let isbn = create.isbn.trim().to_string();
            tables.check_isbn_free(&isbn, None)?;
            tables.check_references(&create)?;

            let now = Utc::now();
            let book = Book {
                id: Eid::new(),
                title: create.title.trim().to_string(),
                isbn,
                description: trimmed(create.description),
                price: create.price,
                stock_quantity: create.stock_quantity,
                publication_year: create.publication_year,
                pages: create.pages,
                language: trimmed(create.language),
                author_id: create.author_id,
                category_id: create.category_id,
                created_at: now,
                updated_at: now,
                embedding: None,
                embedding_updated_at: None,
            };
            tables.books.push(book.clone());
            Ok(book)
        })
    }

    fn update_book(&self, id: &str, update: BookCreate) -> Result<Book> {
        validate_book(&update)?;

        self.mutate(|tables| {
            tables.book_mut(id)?;

            let isbn = update.isbn.trim().to_string();
            tables.check_isbn_free(&isbn, Some(id))?;
            tables.check_references(&update)?;

            let book = tables.book_mut(id)?;
            book.title = update.title.trim().to_string();
            book.isbn = isbn;
            book.description = trimmed(update.description);
            book.price = update.price;
            book.stock_quantity = update.stock_quantity;
            book.publication_year = update.publication_year;
            book.pages = update.pages;
            book.language = trimmed(update.language);
            book.author_id = update.author_id;
            book.category_id = update.category_id;
            book.updated_at = Utc::now();
            Ok(book.clone())
        })
    }

    fn update_stock(&self, id: &str, stock_quantity: i32) -> Result<Book> {
        validate_stock(stock_quantity)?;

        self.mutate(|tables| {
            let book = tables.book_mut(id)?;
            book.stock_quantity = stock_quantity;
            book.updated_at = Utc::now();
            Ok(book.clone())
        })
    }

    fn delete_book(&self, id: &str) -> Result<()> {
        self.mutate(|tables| {
            let idx = tables
                .books
                .iter()
                .position(|b| b.id.as_str() == id)
                .ok_or_else(|| CatalogError::not_found("book", id))?;
            tables.books.remove(idx);
            Ok(())
        })
    }

    fn set_embedding(
        &self,
        id: &str,
        embedding: Vec<f32>,
        computed_at: DateTime<Utc>,
    ) -> Result<Book> {
        self.mutate(|tables| {
            let book = tables.book_mut(id)?;
            book.embedding = Some(embedding);
            book.embedding_updated_at = Some(computed_at);
            Ok(book.clone())
        })
    }

    fn filter_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        Ok(self
            .read()?
            .books
            .iter()
            .filter(|b| query.matches(b))
            .cloned()
            .collect())
    }

    fn search_books(&self, query: &BookQuery) -> Result<Page<Book>> {
        query.page_request().apply(self.filter_books(query)?)
    }

    fn counts(&self) -> Result<CatalogCounts> {
        let tables = self.read()?;
        Ok(CatalogCounts {
            authors: tables.authors.len(),
            categories: tables.categories.len(),
            books: tables.books.len(),
        })
    }
}
