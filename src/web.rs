use crate::{
    app::{App, AppError},
    catalog::{
        Author, AuthorCreate, AuthorFilter, BookCreate, BookQuery, BookView, CatalogCounts,
        Category, CategoryCreate, CategoryFilter, Page, PageRequest,
    },
    seed::SeedReport,
    semantic::{ScoredResult, DEFAULT_RECOMMENDATION_LIMIT, DEFAULT_SEARCH_LIMIT},
};
use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
struct SharedState {
    app: Arc<App>,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

pub fn router(app: Arc<App>) -> Router {
    let shared_state = Arc::new(SharedState { app });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/authors", get(list_authors).post(create_author))
        .route("/api/authors/search", get(search_authors))
        .route("/api/authors/nationalities", get(nationalities))
        .route(
            "/api/authors/:id",
            get(get_author).put(update_author).delete(delete_author),
        )
        .route("/api/authors/:id/books", get(author_books))
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/search", get(search_categories))
        .route(
            "/api/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/api/categories/:id/books", get(category_books))
        .route("/api/books", get(search_books).post(create_book))
        .route("/api/books/low-stock", get(low_stock))
        .route("/api/books/isbn/:isbn", get(get_book_by_isbn))
        .route(
            "/api/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/books/:id/stock", patch(update_stock))
        .route("/api/ai/embeddings/recompute", post(recompute_embeddings))
        .route("/api/ai/embeddings/book/:id", post(compute_embedding))
        .route("/api/ai/recommendations/book/:id", get(recommend_by_book))
        .route("/api/ai/semantic-search", get(semantic_search))
        .route("/api/admin/seed-ten-books", post(seed_ten_books))
        .route("/api/stats", get(stats))
        .layer(cors)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn start_app(app: App) -> anyhow::Result<()> {
    let listen = app.config().server.listen.clone();
    let router = router(Arc::new(app));

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    log::info!("listening on {listen}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: App) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(app))
}

#[derive(Debug)]
pub struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::MissingEmbedding(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_)
            | AppError::Provider(_)
            | AppError::MalformedResponse(_)
            | AppError::IO(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.0.is_client_error() {
            log::debug!("{}: {}", self.0.kind(), self.0);
        } else {
            log::error!("{:?}", self.0);
        }

        let mut body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        if let Some(hint) = self.0.hint() {
            body["hint"] = json!(hint);
        }

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

type AppState = State<Arc<SharedState>>;

async fn list_authors(
    State(state): AppState,
    Query(filter): Query<AuthorFilter>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<Author>>, HttpError> {
    log::debug!("filter: {filter:?}, page: {page:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || app.authors(&filter, &page).map(Json).map_err(Into::into))
}

#[derive(Debug, Default, Deserialize)]
pub struct NameParams {
    pub name: Option<String>,
}

async fn search_authors(
    State(state): AppState,
    Query(params): Query<NameParams>,
) -> Result<Json<Vec<Author>>, HttpError> {
    let name = params.name.unwrap_or_default();

    let app = state.app.clone();
    tokio::task::block_in_place(move || app.search_authors(&name).map(Json).map_err(Into::into))
}

async fn nationalities(State(state): AppState) -> Result<Json<Vec<String>>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.nationalities().map(Json).map_err(Into::into))
}

async fn create_author(
    State(state): AppState,
    Json(payload): Json<AuthorCreate>,
) -> Result<(StatusCode, Json<Author>), HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let author = app.create_author(payload)?;
        Ok((StatusCode::CREATED, Json(author)))
    })
}

async fn get_author(
    State(state): AppState,
    Path(id): Path<String>,
) -> Result<Json<Author>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.author(&id).map(Json).map_err(Into::into))
}

async fn update_author(
    State(state): AppState,
    Path(id): Path<String>,
    Json(payload): Json<AuthorCreate>,
) -> Result<Json<Author>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.update_author(&id, payload)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn delete_author(
    State(state): AppState,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.delete_author(&id)?;
        Ok(StatusCode::NO_CONTENT)
    })
}

async fn author_books(
    State(state): AppState,
    Path(id): Path<String>,
) -> Result<Json<Vec<BookView>>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.author_books(&id).map(Json).map_err(Into::into))
}

async fn list_categories(
    State(state): AppState,
    Query(filter): Query<CategoryFilter>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<Category>>, HttpError> {
    log::debug!("filter: {filter:?}, page: {page:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.categories(&filter, &page)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn search_categories(
    State(state): AppState,
    Query(params): Query<NameParams>,
) -> Result<Json<Vec<Category>>, HttpError> {
    let name = params.name.unwrap_or_default();

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.search_categories(&name)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn create_category(
    State(state): AppState,
    Json(payload): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<Category>), HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let category = app.create_category(payload)?;
        Ok((StatusCode::CREATED, Json(category)))
    })
}

async fn get_category(
    State(state): AppState,
    Path(id): Path<String>,
) -> Result<Json<Category>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.category(&id).map(Json).map_err(Into::into))
}

async fn update_category(
    State(state): AppState,
    Path(id): Path<String>,
    Json(payload): Json<CategoryCreate>,
) -> Result<Json<Category>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.update_category(&id, payload)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn delete_category(
    State(state): AppState,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.delete_category(&id)?;
        Ok(StatusCode::NO_CONTENT)
    })
}

async fn category_books(
    State(state): AppState,
    Path(id): Path<String>,
) -> Result<Json<Vec<BookView>>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.category_books(&id).map(Json).map_err(Into::into))
}

async fn search_books(
    State(state): AppState,
    Query(query): Query<BookQuery>,
) -> Result<Json<Page<BookView>>, HttpError> {
    log::debug!("query: {query:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || app.search_books(&query).map(Json).map_err(Into::into))
}

async fn create_book(
    State(state): AppState,
    Json(payload): Json<BookCreate>,
) -> Result<(StatusCode, Json<BookView>), HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let book = app.create_book(payload)?;
        Ok((StatusCode::CREATED, Json(book)))
    })
}

async fn get_book(
    State(state): AppState,
    Path(id): Path<String>,
) -> Result<Json<BookView>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.book(&id).map(Json).map_err(Into::into))
}

async fn get_book_by_isbn(
    State(state): AppState,
    Path(isbn): Path<String>,
) -> Result<Json<BookView>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.book_by_isbn(&isbn).map(Json).map_err(Into::into))
}

async fn update_book(
    State(state): AppState,
    Path(id): Path<String>,
    Json(payload): Json<BookCreate>,
) -> Result<Json<BookView>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || app.update_book(&id, payload).map(Json).map_err(Into::into))
}

async fn delete_book(
    State(state): AppState,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.delete_book(&id)?;
        Ok(StatusCode::NO_CONTENT)
    })
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StockUpdateRequest {
    #[serde(rename = "stockQuantity", alias = "stock_quantity")]
    pub stock_quantity: i32,
}

async fn update_stock(
    State(state): AppState,
    Path(id): Path<String>,
    Json(payload): Json<StockUpdateRequest>,
) -> Result<Json<BookView>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.update_stock(&id, payload.stock_quantity)
            .map(Json)
            .map_err(Into::into)
    })
}

#[derive(Debug, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<i32>,
}

async fn low_stock(
    State(state): AppState,
    Query(params): Query<LowStockParams>,
) -> Result<Json<Vec<BookView>>, HttpError> {
    let threshold = params
        .threshold
        .ok_or_else(|| AppError::Validation("threshold is required".to_string()))?;

    let app = state.app.clone();
    tokio::task::block_in_place(move || app.low_stock(threshold).map(Json).map_err(Into::into))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecomputeParams {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecomputeResponse {
    pub updated: usize,
    pub total: usize,
    pub message: String,
}

async fn recompute_embeddings(
    State(state): AppState,
    Query(params): Query<RecomputeParams>,
) -> Result<Json<RecomputeResponse>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let report = app.recompute_embeddings(params.force)?;
        Ok(Json(RecomputeResponse {
            updated: report.updated,
            total: report.total,
            message: format!(
                "Successfully computed embeddings for {} books",
                report.updated
            ),
        }))
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeEmbeddingResponse {
    pub book_id: String,
    pub ok: bool,
}

async fn compute_embedding(
    State(state): AppState,
    Path(id): Path<String>,
) -> Result<Json<ComputeEmbeddingResponse>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.compute_embedding(&id)?;
        Ok(Json(ComputeEmbeddingResponse {
            book_id: id,
            ok: true,
        }))
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct SimilarityParams {
    pub q: Option<String>,
    pub size: Option<usize>,
}

async fn recommend_by_book(
    State(state): AppState,
    Path(id): Path<String>,
    Query(params): Query<SimilarityParams>,
) -> Result<Json<Vec<ScoredResult>>, HttpError> {
    let limit = params.size.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);

    let app = state.app.clone();
    tokio::task::block_in_place(move || app.recommend(&id, limit).map(Json).map_err(Into::into))
}

async fn semantic_search(
    State(state): AppState,
    Query(params): Query<SimilarityParams>,
) -> Result<Json<Vec<ScoredResult>>, HttpError> {
    let limit = params.size.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let query = params.q.unwrap_or_default();

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        app.semantic_search(&query, limit)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn seed_ten_books(State(state): AppState) -> Result<Json<SeedReport>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.seed_ten_books().map(Json).map_err(Into::into))
}

async fn stats(State(state): AppState) -> Result<Json<CatalogCounts>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.stats().map(Json).map_err(Into::into))
}
