use std::sync::Arc;

use super::{add_books, create_app, create_app_with, MockProvider};
use crate::app::AppError;
use crate::catalog::{self, AuthorCreate, Book, BookCreate, Catalog, CatalogManager, CategoryCreate};
use crate::config::CatalogBackendKind;
use crate::semantic::{EmbeddingError, EmbeddingProvider, SemanticError, SemanticService};
use crate::semantic::preprocess::embedding_text;
use crate::semantic::rank::cosine_similarity;

const BOOKS: [(&str, &str); 4] = [
    ("Designing Data-Intensive Applications", "Distributed databases and streams"),
    ("Database Internals", "Storage engines and distributed databases"),
    ("The Art of Computer Programming", "Fundamental algorithms"),
    ("Algorithms Unlocked", "Introductory algorithms and sorting"),
];

#[test]
fn test_recompute_computes_missing_embeddings_once() {
    let (app, provider, _tmp) = create_app();
    add_books(&app, &BOOKS[..3]);

    let report = app.recompute_embeddings(false).unwrap();
    assert_eq!(report.updated, 3);
    assert_eq!(report.total, 3);
    assert_eq!(provider.calls(), 3);

    let report = app.recompute_embeddings(false).unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.total, 3);
    assert_eq!(provider.calls(), 3);

    for book in app.catalog.books().unwrap() {
        assert!(book.has_current_embedding());
    }
}

#[test]
fn test_recompute_force_calls_provider_per_book() {
    let (app, provider, _tmp) = create_app();
    add_books(&app, &BOOKS);

    app.recompute_embeddings(false).unwrap();
    let first = app.catalog.books().unwrap();

    let report = app.recompute_embeddings(true).unwrap();
    assert_eq!(report.updated, 4);
    assert_eq!(provider.calls(), 8);

    let second = app.catalog.books().unwrap();
    for (before, after) in first.iter().zip(second.iter()) {
        assert!(after.embedding_updated_at >= before.embedding_updated_at);
    }
}

#[test]
fn test_recompute_aborts_on_provider_failure() {
    let (app, provider, _tmp) =
        create_app_with(CatalogBackendKind::Csv, MockProvider::failing_on(2));
    add_books(&app, &BOOKS[..3]);

    let err = app.recompute_embeddings(false).unwrap_err();
    assert!(matches!(err, AppError::Provider(_)), "{err:?}");
    assert!(err.to_string().contains("after 2 of 3 books (1 updated)"), "{err}");
    assert_eq!(provider.calls(), 2);

    let with_vector = app
        .catalog
        .books()
        .unwrap()
        .into_iter()
        .filter(|b| b.embedding.is_some())
        .count();
    assert_eq!(with_vector, 1);
}

#[test]
fn test_compute_single_book() {
    let (app, provider, _tmp) = create_app();
    let books = add_books(&app, &BOOKS[..2]);

    let view = app.compute_embedding(&books[0].id).unwrap();
    assert!(view.has_embedding);
    assert!(view.embedding_updated_at.is_some());
    assert_eq!(provider.calls(), 1);

    let stored = app.catalog.book(&books[0].id).unwrap();
    let category = app.catalog.category(&stored.category_id).unwrap();
    let text = embedding_text(&stored, Some("Martin Kleppmann"), Some(category.name.as_str()));
    assert!(text.starts_with("Designing Data-Intensive Applications. Distributed databases"));
    assert_eq!(stored.embedding, Some(MockProvider::vector(&text)));
    assert!(app.catalog.book(&books[1].id).unwrap().embedding.is_none());

    let err = app.compute_embedding("missing").unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn test_recommend_excludes_query_book() {
    let (app, _provider, _tmp) = create_app();
    let books = add_books(&app, &BOOKS);
    app.recompute_embeddings(false).unwrap();

    let results = app.recommend(&books[0].id, 10).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.book_id != books[0].id));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(results[0].book_id, books[1].id);

    let query = app.catalog.book(&books[0].id).unwrap().embedding;
    for result in &results {
        let candidate = app.catalog.book(&result.book_id).unwrap().embedding;
        let expected = cosine_similarity(query.as_deref(), candidate.as_deref());
        assert!((result.score - expected).abs() < 1e-9);
    }

    let results = app.recommend(&books[0].id, 1).unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn test_recommend_errors() {
    let (app, _provider, _tmp) = create_app();
    let books = add_books(&app, &BOOKS[..2]);

    let err = app.recommend("missing", 6).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");

    let err = app.recommend(&books[0].id, 6).unwrap_err();
    assert!(matches!(err, AppError::MissingEmbedding(_)), "{err:?}");
    assert_eq!(err.kind(), "embedding_missing");
}

#[test]
fn test_recommend_skips_books_without_vectors() {
    let (app, _provider, _tmp) = create_app();
    let books = add_books(&app, &BOOKS);

    app.compute_embedding(&books[0].id).unwrap();
    app.compute_embedding(&books[2].id).unwrap();

    let results = app.recommend(&books[0].id, 10).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].book_id, books[2].id);
}

#[test]
fn test_semantic_search_embeds_query_every_call() {
    let (app, provider, _tmp) = create_app();
    let books = add_books(&app, &BOOKS);
    app.recompute_embeddings(false).unwrap();
    assert_eq!(provider.calls(), 4);

    let results = app.semantic_search("algorithms", 2).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].book_id, books[3].id);
    assert_eq!(results[1].book_id, books[2].id);
    assert_eq!(provider.calls(), 5);

    app.semantic_search("algorithms", 2).unwrap();
    assert_eq!(provider.calls(), 6);
}

#[test]
fn test_semantic_search_rejects_blank_query() {
    let (app, provider, _tmp) = create_app();

    let err = app.semantic_search("   ", 10).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_semantic_search_on_empty_catalog() {
    let (app, _provider, _tmp) = create_app();
    assert!(app.semantic_search("anything", 10).unwrap().is_empty());
}

#[test]
fn test_embeddings_survive_reload() {
    for backend in [CatalogBackendKind::Csv, CatalogBackendKind::Json] {
        let (app, _provider, tmp) = create_app_with(backend, MockProvider::default());
        add_books(&app, &BOOKS[..2]);
        app.recompute_embeddings(false).unwrap();
        let before = app.catalog.books().unwrap();
        drop(app);

        let catalog = crate::catalog::open(tmp.path(), backend).unwrap();
        let after = catalog.books().unwrap();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.embedding, a.embedding);
            assert_eq!(b.embedding_updated_at, a.embedding_updated_at);
        }
    }
}

/// Changes the catalog from inside `embed`, the way a concurrent request
/// would while the provider call is in flight.
struct EditingProvider {
    catalog: Arc<Catalog>,
    edit: Box<dyn Fn(&Catalog) + Send + Sync>,
}

impl EmbeddingProvider for EditingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (self.edit)(&self.catalog);
        Ok(MockProvider::vector(text))
    }

    fn name(&self) -> &'static str {
        "editing"
    }
}

fn catalog_with_one_book(tmp: &tempfile::TempDir) -> (Arc<Catalog>, Book) {
    let catalog = catalog::open(tmp.path(), CatalogBackendKind::Json).unwrap();
    let author = catalog
        .create_author(AuthorCreate {
            name: "Robert C. Martin".to_string(),
            ..Default::default()
        })
        .unwrap();
    let category = catalog
        .create_category(CategoryCreate {
            name: "Software Engineering".to_string(),
            ..Default::default()
        })
        .unwrap();
    let book = catalog
        .create_book(BookCreate {
            title: "Clean Code".to_string(),
            isbn: "978-0-13-235088-4".to_string(),
            price: 37.5,
            stock_quantity: 8,
            author_id: author.id,
            category_id: category.id,
            ..Default::default()
        })
        .unwrap();
    (catalog, book)
}

fn service(catalog: &Arc<Catalog>, edit: impl Fn(&Catalog) + Send + Sync + 'static) -> SemanticService {
    let provider = EditingProvider {
        catalog: catalog.clone(),
        edit: Box::new(edit),
    };
    SemanticService::new(catalog.clone(), Arc::new(provider))
}

#[test]
fn test_recompute_does_not_restore_deleted_book() {
    let tmp = tempfile::tempdir().unwrap();
    let (catalog, book) = catalog_with_one_book(&tmp);

    let (book_id, author_id) = (book.id.clone(), book.author_id.clone());
    let service = service(&catalog, move |catalog| {
        catalog.delete_book(&book_id).ok();
        catalog.delete_author(&author_id).ok();
    });

    let report = service.recompute_all(false).unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.total, 1);

    assert!(catalog.books().unwrap().is_empty());
    assert!(catalog.authors().unwrap().is_empty());

    let reopened = catalog::open(tmp.path(), CatalogBackendKind::Json).unwrap();
    assert!(reopened.books().unwrap().is_empty());
}

#[test]
fn test_compute_for_deleted_book_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let (catalog, book) = catalog_with_one_book(&tmp);

    let book_id = book.id.clone();
    let service = service(&catalog, move |catalog| {
        catalog.delete_book(&book_id).ok();
    });

    let err = service.compute_for_book(&book.id).unwrap_err();
    assert!(matches!(err, SemanticError::NotFound(_)), "{err:?}");
    assert!(catalog.books().unwrap().is_empty());
}

#[test]
fn test_recompute_keeps_edits_made_during_the_call() {
    let tmp = tempfile::tempdir().unwrap();
    let (catalog, book) = catalog_with_one_book(&tmp);

    let edited = book.clone();
    let service = service(&catalog, move |catalog| {
        catalog.update_stock(&edited.id, 42).unwrap();
        catalog
            .update_book(
                &edited.id,
                BookCreate {
                    title: "Clean Code, 2nd Edition".to_string(),
                    isbn: edited.isbn.clone(),
                    price: 41.0,
                    stock_quantity: 42,
                    author_id: edited.author_id.clone(),
                    category_id: edited.category_id.clone(),
                    ..Default::default()
                },
            )
            .unwrap();
    });

    let report = service.recompute_all(false).unwrap();
    assert_eq!(report.updated, 1);

    let stored = catalog.book(&book.id).unwrap();
    assert_eq!(stored.title, "Clean Code, 2nd Edition");
    assert_eq!(stored.stock_quantity, 42);
    assert_eq!(stored.price, 41.0);
    assert!(stored.has_current_embedding());
}
