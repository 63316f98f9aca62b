use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CatalogError, Result};
use crate::eid::Eid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: Eid,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
}

/// Payload for both creating and replacing an author.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorCreate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Eid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Eid,
    pub title: String,
    pub isbn: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub stock_quantity: i32,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub pages: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    pub author_id: Eid,
    pub category_id: Eid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Written only by embedding recompute
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub embedding_updated_at: Option<DateTime<Utc>>,
}

impl Book {
    /// Both the vector and its timestamp are present.
    pub fn has_current_embedding(&self) -> bool {
        self.embedding.is_some() && self.embedding_updated_at.is_some()
    }
}

/// Payload for both creating and replacing a book.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCreate {
    pub title: String,
    pub isbn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub stock_quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub author_id: Eid,
    pub category_id: Eid,
}

/// A book as returned to API clients: references resolved, vector omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub id: Eid,
    pub title: String,
    pub isbn: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock_quantity: i32,
    pub publication_year: Option<i32>,
    pub pages: Option<i32>,
    pub language: Option<String>,
    pub author_id: Eid,
    pub author_name: Option<String>,
    pub category_id: Eid,
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub has_embedding: bool,
    pub embedding_updated_at: Option<DateTime<Utc>>,
}

impl BookView {
    pub fn new(book: Book, author_name: Option<String>, category_name: Option<String>) -> Self {
        Self {
            has_embedding: book.embedding.is_some(),
            id: book.id,
            title: book.title,
            isbn: book.isbn,
            description: book.description,
            price: book.price,
            stock_quantity: book.stock_quantity,
            publication_year: book.publication_year,
            pages: book.pages,
            language: book.language,
            author_id: book.author_id,
            author_name,
            category_id: book.category_id,
            category_name,
            created_at: book.created_at,
            updated_at: book.updated_at,
            embedding_updated_at: book.embedding_updated_at,
        }
    }
}

/// Book filters. An absent filter imposes no constraint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "author_id")]
    pub author_id: Option<Eid>,
    #[serde(default, alias = "category_id")]
    pub category_id: Option<Eid>,
    #[serde(default, alias = "min_price")]
    pub min_price: Option<f64>,
    #[serde(default, alias = "max_price")]
    pub max_price: Option<f64>,
    /// Stock at or below this value
    #[serde(default, alias = "max_stock")]
    pub max_stock: Option<i32>,

    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default, alias = "sort_by")]
    pub sort_by: Option<String>,
    #[serde(default, alias = "sort_dir")]
    pub sort_dir: Option<String>,
}

impl BookQuery {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(title) = &self.title {
            if !book.title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }
        if let Some(author_id) = &self.author_id {
            if &book.author_id != author_id {
                return false;
            }
        }
        if let Some(category_id) = &self.category_id {
            if &book.category_id != category_id {
                return false;
            }
        }
        if let Some(min_price) = self.min_price {
            if book.price < min_price {
                return false;
            }
        }
        if let Some(max_price) = self.max_price {
            if book.price > max_price {
                return false;
            }
        }
        if let Some(max_stock) = self.max_stock {
            if book.stock_quantity > max_stock {
                return false;
            }
        }
        true
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            size: self.size,
            sort_by: self.sort_by.clone(),
            sort_dir: self.sort_dir.clone(),
        }
    }
}

/// Author listing filters, combined with AND.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthorFilter {
    /// Case-insensitive substring of the name
    #[serde(default)]
    pub search: Option<String>,
    /// Case-insensitive exact nationality
    #[serde(default)]
    pub nationality: Option<String>,
}

impl AuthorFilter {
    pub fn matches(&self, author: &Author) -> bool {
        if let Some(search) = non_blank(&self.search) {
            if !contains_ignore_case(&author.name, search) {
                return false;
            }
        }
        if let Some(nationality) = non_blank(&self.nationality) {
            let same = author
                .nationality
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(nationality.trim()));
            if !same {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryFilter {
    /// Case-insensitive substring of the name
    #[serde(default)]
    pub search: Option<String>,
}

impl CategoryFilter {
    pub fn matches(&self, category: &Category) -> bool {
        match non_blank(&self.search) {
            Some(search) => contains_ignore_case(&category.name, search),
            None => true,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&needle.trim().to_lowercase())
}

/// Records a listing can be ordered by.
///
/// Field names are matched after [`sort_key`] normalization, so `stockQuantity`
/// and `stock_quantity` name the same field.
pub trait Sortable {
    const SORT_FIELDS: &'static [&'static str];

    fn compare_by(&self, other: &Self, field: &str) -> Ordering;
}

/// Lowercases and strips underscores.
pub fn sort_key(field: &str) -> String {
    field
        .trim()
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn cmp_opt_text(a: &Option<String>, b: &Option<String>) -> Ordering {
    a.as_deref()
        .map(str::to_lowercase)
        .cmp(&b.as_deref().map(str::to_lowercase))
}

impl Sortable for Author {
    const SORT_FIELDS: &'static [&'static str] = &["id", "name", "nationality", "bio"];

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "name" => cmp_text(&self.name, &other.name),
            "nationality" => cmp_opt_text(&self.nationality, &other.nationality),
            "bio" => cmp_opt_text(&self.bio, &other.bio),
            _ => Ordering::Equal,
        }
    }
}

impl Sortable for Category {
    const SORT_FIELDS: &'static [&'static str] = &["id", "name", "description"];

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "name" => cmp_text(&self.name, &other.name),
            "description" => cmp_opt_text(&self.description, &other.description),
            _ => Ordering::Equal,
        }
    }
}

impl Sortable for Book {
    const SORT_FIELDS: &'static [&'static str] = &[
        "id",
        "title",
        "isbn",
        "price",
        "stockquantity",
        "publicationyear",
        "pages",
        "language",
        "createdat",
        "updatedat",
    ];

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "title" => cmp_text(&self.title, &other.title),
            "isbn" => self.isbn.cmp(&other.isbn),
            "price" => self.price.total_cmp(&other.price),
            "stockquantity" => self.stock_quantity.cmp(&other.stock_quantity),
            "publicationyear" => self.publication_year.cmp(&other.publication_year),
            "pages" => self.pages.cmp(&other.pages),
            "language" => cmp_opt_text(&self.language, &other.language),
            "createdat" => self.created_at.cmp(&other.created_at),
            "updatedat" => self.updated_at.cmp(&other.updated_at),
            _ => Ordering::Equal,
        }
    }
}

/// Paging and ordering for listings.
///
/// Without `sortBy` records keep insertion order. `sortDir` is descending
/// only when it reads `desc` (any case).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default, alias = "sort_by")]
    pub sort_by: Option<String>,
    #[serde(default, alias = "sort_dir")]
    pub sort_dir: Option<String>,
}

impl PageRequest {
    pub fn descending(&self) -> bool {
        self.sort_dir
            .as_deref()
            .is_some_and(|dir| dir.trim().eq_ignore_ascii_case("desc"))
    }

    /// Orders `items` and slices out the requested page.
    pub fn apply<T: Sortable>(&self, mut items: Vec<T>) -> Result<Page<T>> {
        if let Some(field) = self.sort_by.as_deref().filter(|f| !f.trim().is_empty()) {
            let key = sort_key(field);
            if !T::SORT_FIELDS.contains(&key.as_str()) {
                return Err(CatalogError::Validation(format!(
                    "cannot sort by '{field}', expected one of: {}",
                    T::SORT_FIELDS.join(", ")
                )));
            }

            if self.descending() {
                items.sort_by(|a, b| b.compare_by(a, &key));
            } else {
                items.sort_by(|a, b| a.compare_by(b, &key));
            }
        }

        Ok(Page::paginate(items, self))
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slices `items` into the requested page, page 0 of size
    /// [`DEFAULT_PAGE_SIZE`] when not given.
    pub fn paginate(items: Vec<T>, request: &PageRequest) -> Self {
        let total_elements = items.len();
        let page = request.page.unwrap_or(0);
        let size = request.size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE);

        let content = items
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .collect();

        Page {
            content,
            page,
            size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCounts {
    pub authors: usize,
    pub categories: usize,
    pub books: usize,
}

impl CatalogCounts {
    pub fn is_empty(&self) -> bool {
        self.authors == 0 && self.categories == 0 && self.books == 0
    }
}
