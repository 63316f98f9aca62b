//! Text fed to the embedding provider for a book.

use crate::catalog::Book;

/// Builds the embedding input for a book.
///
/// Segments in order: title, description, `Author: <name>`,
/// `Category: <name>`. Blank or absent fields are left out; every segment is
/// terminated by a period and joined with a space.
pub fn embedding_text(book: &Book, author_name: Option<&str>, category_name: Option<&str>) -> String {
    let segments = [
        present(Some(book.title.as_str())).map(str::to_string),
        present(book.description.as_deref()).map(str::to_string),
        present(author_name).map(|name| format!("Author: {name}")),
        present(category_name).map(|name| format!("Category: {name}")),
    ];

    segments
        .into_iter()
        .flatten()
        .map(|segment| format!("{segment}. "))
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
