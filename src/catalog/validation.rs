use super::{
    types::{AuthorCreate, BookCreate, CategoryCreate},
    CatalogError,
};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const BIO_MAX: usize = 1000;
const NATIONALITY_MAX: usize = 50;
const CATEGORY_DESCRIPTION_MAX: usize = 500;
const BOOK_DESCRIPTION_MAX: usize = 2000;
const TITLE_MAX: usize = 255;

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn check(&mut self, ok: bool, msg: impl FnOnce() -> String) {
        if !ok {
            self.0.push(msg());
        }
    }

    fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            let len = value.chars().count();
            self.check(len <= max, || format!("{field} cannot exceed {max} characters"));
        }
    }

    fn finish(self) -> Result<(), CatalogError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation(self.0.join("; ")))
        }
    }
}

fn name_len(name: &str) -> usize {
    name.trim().chars().count()
}

pub fn validate_author(author: &AuthorCreate) -> Result<(), CatalogError> {
    let mut v = Violations::default();
    let len = name_len(&author.name);
    v.check(len >= NAME_MIN && len <= NAME_MAX, || {
        format!("author name must be between {NAME_MIN} and {NAME_MAX} characters")
    });
    v.max_len("bio", author.bio.as_deref(), BIO_MAX);
    v.max_len("nationality", author.nationality.as_deref(), NATIONALITY_MAX);
    v.finish()
}

pub fn validate_category(category: &CategoryCreate) -> Result<(), CatalogError> {
    let mut v = Violations::default();
    let len = name_len(&category.name);
    v.check(len >= NAME_MIN && len <= NAME_MAX, || {
        format!("category name must be between {NAME_MIN} and {NAME_MAX} characters")
    });
    v.max_len(
        "description",
        category.description.as_deref(),
        CATEGORY_DESCRIPTION_MAX,
    );
    v.finish()
}

pub fn validate_book(book: &BookCreate) -> Result<(), CatalogError> {
    let mut v = Violations::default();
    v.check(!book.title.trim().is_empty(), || "title is required".to_string());
    v.max_len("title", Some(&book.title), TITLE_MAX);
    v.check(!book.isbn.trim().is_empty(), || "isbn is required".to_string());
    v.max_len("description", book.description.as_deref(), BOOK_DESCRIPTION_MAX);
    v.check(book.price.is_finite() && book.price >= 0.0, || {
        "price must be a non-negative number".to_string()
    });
    v.check(book.stock_quantity >= 0, || {
        "stock quantity cannot be negative".to_string()
    });
    v.check(book.pages.map(|p| p > 0).unwrap_or(true), || {
        "pages must be positive".to_string()
    });
    v.check(!book.author_id.trim().is_empty(), || "author id is required".to_string());
    v.check(!book.category_id.trim().is_empty(), || {
        "category id is required".to_string()
    });
    v.finish()
}

pub fn validate_stock(stock_quantity: i32) -> Result<(), CatalogError> {
    let mut v = Violations::default();
    v.check(stock_quantity >= 0, || {
        "stock quantity cannot be negative".to_string()
    });
    v.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> BookCreate {
        BookCreate {
            title: "Refactoring".to_string(),
            isbn: "978-0-1".to_string(),
            price: 39.99,
            stock_quantity: 3,
            author_id: "a".into(),
            category_id: "c".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_book_passes() {
        assert!(validate_book(&book()).is_ok());
    }

    #[test]
    fn test_book_violations_are_collected() {
        let mut b = book();
        b.title = "  ".to_string();
        b.price = -1.0;
        b.stock_quantity = -5;

        let Err(CatalogError::Validation(msg)) = validate_book(&b) else {
            panic!("expected validation error");
        };
        assert!(msg.contains("title is required"));
        assert!(msg.contains("price"));
        assert!(msg.contains("stock quantity"));
    }

    #[test]
    fn test_author_name_bounds() {
        let short = AuthorCreate {
            name: "A".to_string(),
            ..Default::default()
        };
        assert!(validate_author(&short).is_err());

        let ok = AuthorCreate {
            name: "Fred Brooks".to_string(),
            nationality: Some("USA".to_string()),
            ..Default::default()
        };
        assert!(validate_author(&ok).is_ok());

        let long_nationality = AuthorCreate {
            name: "Fred Brooks".to_string(),
            nationality: Some("x".repeat(51)),
            ..Default::default()
        };
        assert!(validate_author(&long_nationality).is_err());
    }

    #[test]
    fn test_category_name_required() {
        let empty = CategoryCreate::default();
        assert!(validate_category(&empty).is_err());
    }
}
