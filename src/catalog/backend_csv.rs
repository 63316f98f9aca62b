use std::path::Path;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};

use super::{Author, Book, CatalogBackend, Category, Result, Tables};
use crate::storage::{BackendLocal, StorageManager};

const AUTHORS: &str = "authors.csv";
const CATEGORIES: &str = "categories.csv";
const BOOKS: &str = "books.csv";

const AUTHOR_HEADERS: [&str; 4] = ["id", "name", "bio", "nationality"];
const CATEGORY_HEADERS: [&str; 3] = ["id", "name", "description"];
const BOOK_HEADERS: [&str; 15] = [
    "id",
    "title",
    "isbn",
    "description",
    "price",
    "stock_quantity",
    "publication_year",
    "pages",
    "language",
    "author_id",
    "category_id",
    "created_at",
    "updated_at",
    "embedding",
    "embedding_updated_at",
];

/// Relational-style backend: one CSV table per entity, books referencing
/// authors and categories by id.
pub struct BackendCsv {
    store: BackendLocal,
}

impl BackendCsv {
    pub fn new(dir: &Path) -> Result<Self> {
        Ok(Self {
            store: BackendLocal::new(dir)?,
        })
    }

    fn read_table(&self, table: &str) -> Result<Option<Vec<u8>>> {
        if !self.store.exists(table) {
            return Ok(None);
        }
        Ok(Some(self.store.read(table)?))
    }

    fn write_table<I>(&self, table: &str, headers: &[&str], rows: I) -> Result<()>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut csv_wrt = csv::Writer::from_writer(vec![]);
        csv_wrt.write_record(headers)?;
        for row in rows {
            csv_wrt.write_record(&row)?;
        }
        let data = csv_wrt
            .into_inner()
            .map_err(|err| anyhow!("couldnt flush {table}: {err}"))?;
        self.store.write(table, &data)?;
        Ok(())
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, name: &str) -> anyhow::Result<&'r str> {
    record
        .get(idx)
        .ok_or_else(|| anyhow!("couldnt get record {name}"))
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn optional_parse<T>(value: &str, name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<T>()
        .map(Some)
        .with_context(|| format!("invalid {name}: {value}"))
}

fn timestamp(value: &str, name: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("invalid {name}: {value}"))
}

/// Vectors are stored as space separated numbers in a single column.
fn encode_embedding(embedding: &Option<Vec<f32>>) -> String {
    embedding
        .as_ref()
        .map(|values| {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn decode_embedding(value: &str) -> anyhow::Result<Option<Vec<f32>>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .split_whitespace()
        .map(|v| v.parse::<f32>().with_context(|| format!("invalid embedding value: {v}")))
        .collect::<anyhow::Result<Vec<_>>>()
        .map(Some)
}

fn parse_author(record: &csv::StringRecord) -> anyhow::Result<Author> {
    Ok(Author {
        id: field(record, 0, "id")?.into(),
        name: field(record, 1, "name")?.to_string(),
        bio: optional(field(record, 2, "bio")?),
        nationality: optional(field(record, 3, "nationality")?),
    })
}

fn parse_category(record: &csv::StringRecord) -> anyhow::Result<Category> {
    Ok(Category {
        id: field(record, 0, "id")?.into(),
        name: field(record, 1, "name")?.to_string(),
        description: optional(field(record, 2, "description")?),
    })
}

fn parse_book(record: &csv::StringRecord) -> anyhow::Result<Book> {
    let price = field(record, 4, "price")?;
    let stock = field(record, 5, "stock_quantity")?;

    Ok(Book {
        id: field(record, 0, "id")?.into(),
        title: field(record, 1, "title")?.to_string(),
        isbn: field(record, 2, "isbn")?.to_string(),
        description: optional(field(record, 3, "description")?),
        price: price
            .parse()
            .with_context(|| format!("invalid price: {price}"))?,
        stock_quantity: stock
            .parse()
            .with_context(|| format!("invalid stock_quantity: {stock}"))?,
        publication_year: optional_parse(field(record, 6, "publication_year")?, "publication_year")?,
        pages: optional_parse(field(record, 7, "pages")?, "pages")?,
        language: optional(field(record, 8, "language")?),
        author_id: field(record, 9, "author_id")?.into(),
        category_id: field(record, 10, "category_id")?.into(),
        created_at: timestamp(field(record, 11, "created_at")?, "created_at")?,
        updated_at: timestamp(field(record, 12, "updated_at")?, "updated_at")?,
        embedding: decode_embedding(field(record, 13, "embedding")?)?,
        embedding_updated_at: optional(field(record, 14, "embedding_updated_at")?)
            .map(|ts| timestamp(&ts, "embedding_updated_at"))
            .transpose()?,
    })
}

fn book_row(book: &Book) -> Vec<String> {
    vec![
        book.id.to_string(),
        book.title.clone(),
        book.isbn.clone(),
        book.description.clone().unwrap_or_default(),
        book.price.to_string(),
        book.stock_quantity.to_string(),
        book.publication_year.map(|y| y.to_string()).unwrap_or_default(),
        book.pages.map(|p| p.to_string()).unwrap_or_default(),
        book.language.clone().unwrap_or_default(),
        book.author_id.to_string(),
        book.category_id.to_string(),
        book.created_at.to_rfc3339(),
        book.updated_at.to_rfc3339(),
        encode_embedding(&book.embedding),
        book.embedding_updated_at
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_default(),
    ]
}

impl CatalogBackend for BackendCsv {
    fn load(&self) -> Result<Tables> {
        if !self.store.exists(BOOKS) {
            log::info!("Creating new database at {}", self.store.base_dir.display());
        }

        let mut tables = Tables::default();

        if let Some(data) = self.read_table(AUTHORS)? {
            let mut reader = csv::Reader::from_reader(data.as_slice());
            for record in reader.records() {
                tables.authors.push(parse_author(&record?)?);
            }
        }

        if let Some(data) = self.read_table(CATEGORIES)? {
            let mut reader = csv::Reader::from_reader(data.as_slice());
            for record in reader.records() {
                tables.categories.push(parse_category(&record?)?);
            }
        }

        if let Some(data) = self.read_table(BOOKS)? {
            let mut reader = csv::Reader::from_reader(data.as_slice());
            for record in reader.records() {
                tables.books.push(parse_book(&record?)?);
            }
        }

        // make sure every table file exists from now on
        self.save(&tables)?;

        Ok(tables)
    }

    fn save(&self, tables: &Tables) -> Result<()> {
        self.write_table(
            AUTHORS,
            &AUTHOR_HEADERS,
            tables.authors.iter().map(|a| {
                vec![
                    a.id.to_string(),
                    a.name.clone(),
                    a.bio.clone().unwrap_or_default(),
                    a.nationality.clone().unwrap_or_default(),
                ]
            }),
        )?;

        self.write_table(
            CATEGORIES,
            &CATEGORY_HEADERS,
            tables.categories.iter().map(|c| {
                vec![
                    c.id.to_string(),
                    c.name.clone(),
                    c.description.clone().unwrap_or_default(),
                ]
            }),
        )?;

        self.write_table(BOOKS, &BOOK_HEADERS, tables.books.iter().map(book_row))?;

        Ok(())
    }
}
