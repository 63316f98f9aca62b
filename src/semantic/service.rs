//! Embedding recompute and similarity queries over the catalog.
//!
//! Candidate vectors come from the catalog's stored embeddings and are
//! filtered client-side. Query vectors for free-text search are computed
//! fresh on every call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::embeddings::{EmbeddingError, EmbeddingProvider};
use super::preprocess::embedding_text;
use super::rank::{rank, Candidate, ScoredResult};
use crate::catalog::{optional, Book, CatalogError, CatalogManager};
use crate::eid::Eid;

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 6;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Errors that can occur during semantic operations.
#[derive(Debug, thiserror::Error)]
pub enum SemanticError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// A provider failure stopped a bulk recompute. Books updated before the
    /// failure keep their new vectors.
    #[error("embedding recompute aborted after {attempted} of {total} books ({updated} updated): {source}")]
    RecomputeFailed {
        attempted: usize,
        updated: usize,
        total: usize,
        #[source]
        source: EmbeddingError,
    },

    #[error("book not found with id: {0}")]
    NotFound(String),

    #[error("book {0} has no stored embedding, recompute embeddings first")]
    MissingEmbedding(String),

    #[error("{0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeReport {
    pub updated: usize,
    pub total: usize,
}

pub struct SemanticService {
    catalog: Arc<dyn CatalogManager>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl SemanticService {
    pub fn new(catalog: Arc<dyn CatalogManager>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { catalog, provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Recomputes embeddings for every book, strictly one after another.
    ///
    /// Without `force`, books that already carry a vector and a timestamp are
    /// skipped. The first provider failure aborts the run. A book deleted
    /// while its embedding was being computed is skipped.
    pub fn recompute_all(&self, force: bool) -> Result<RecomputeReport, SemanticError> {
        let books = self.catalog.books()?;
        let total = books.len();
        let names = self.names()?;

        let mut attempted = 0;
        let mut updated = 0;

        for book in books {
            if !force && book.has_current_embedding() {
                continue;
            }

            attempted += 1;
            let text = names.text_for(&book);
            let embedding = self
                .provider
                .embed(&text)
                .map_err(|source| SemanticError::RecomputeFailed {
                    attempted,
                    updated,
                    total,
                    source,
                })?;

            match optional(self.store_embedding(&book.id, embedding))? {
                Some(_) => updated += 1,
                None => log::debug!("book {} was deleted during recompute, skipping", book.id),
            }
        }

        log::info!("recomputed embeddings for {updated} of {total} books (force: {force})");

        Ok(RecomputeReport { updated, total })
    }

    /// Recomputes the embedding of one book regardless of its current state.
    pub fn compute_for_book(&self, id: &str) -> Result<Book, SemanticError> {
        let book = self.find_book(id)?;
        let names = self.names()?;

        let embedding = self.provider.embed(&names.text_for(&book))?;
        let book = optional(self.store_embedding(id, embedding))?
            .ok_or_else(|| SemanticError::NotFound(id.to_string()))?;

        log::debug!("recomputed embedding for book {id}");
        Ok(book)
    }

    /// Books most similar to `id`, by the stored vectors. The book itself is
    /// never part of the result.
    pub fn recommend_by_book(&self, id: &str, limit: usize) -> Result<Vec<ScoredResult>, SemanticError> {
        let book = self.find_book(id)?;
        let query = book
            .embedding
            .as_deref()
            .ok_or_else(|| SemanticError::MissingEmbedding(id.to_string()))?;

        let books = self.catalog.books()?;
        let candidates = candidates(&books).filter(|c| c.id != &book.id);

        Ok(rank(query, candidates, limit))
    }

    /// Books most similar to free text. The query is embedded on every call.
    pub fn semantic_search(&self, query: &str, limit: usize) -> Result<Vec<ScoredResult>, SemanticError> {
        if query.trim().is_empty() {
            return Err(SemanticError::InvalidQuery(
                "search query must not be empty".to_string(),
            ));
        }

        let query_embedding = self.provider.embed(query)?;

        let books = self.catalog.books()?;
        Ok(rank(&query_embedding, candidates(&books), limit))
    }

    fn find_book(&self, id: &str) -> Result<Book, SemanticError> {
        optional(self.catalog.book(id))?.ok_or_else(|| SemanticError::NotFound(id.to_string()))
    }

    fn store_embedding(&self, id: &str, embedding: Vec<f32>) -> crate::catalog::Result<Book> {
        self.catalog.set_embedding(id, embedding, Utc::now())
    }

    fn names(&self) -> Result<Names, SemanticError> {
        Ok(Names {
            authors: self
                .catalog
                .authors()?
                .into_iter()
                .map(|a| (a.id, a.name))
                .collect(),
            categories: self
                .catalog
                .categories()?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect(),
        })
    }
}

/// Books that have a stored vector, in catalog order.
fn candidates(books: &[Book]) -> impl Iterator<Item = Candidate<'_>> {
    books.iter().filter(|b| b.embedding.is_some()).map(|b| Candidate {
        id: &b.id,
        title: &b.title,
        embedding: b.embedding.as_deref(),
    })
}

struct Names {
    authors: HashMap<Eid, String>,
    categories: HashMap<Eid, String>,
}

impl Names {
    fn text_for(&self, book: &Book) -> String {
        embedding_text(
            book,
            self.authors.get(&book.author_id).map(String::as_str),
            self.categories.get(&book.category_id).map(String::as_str),
        )
    }
}
