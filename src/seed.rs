//! Sample catalog data.
//!
//! `seed_if_empty` runs at daemon startup and only ever touches an empty
//! catalog. `seed_ten_books` can be called at any time and never duplicates a
//! book by ISBN.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{
    Author, AuthorCreate, BookCreate, Category, CategoryCreate, CatalogCounts, CatalogManager,
    Result,
};

/// Catalog size reached by startup seeding.
pub const SEED_BOOK_COUNT: usize = 50;

const CATEGORIES: [&str; 20] = [
    "Algorithms",
    "Data Structures",
    "Operating Systems",
    "Computer Networks",
    "Databases",
    "Programming Languages",
    "Theory of Computation",
    "Computer Architecture",
    "Compilers",
    "Security",
    "Software Engineering",
    "Machine Learning",
    "Artificial Intelligence",
    "Natural Language Processing",
    "Distributed Systems",
    "Graphics",
    "Human-Computer Interaction",
    "Cloud Computing",
    "Testing",
    "DevOps",
];

/// (name, bio, nationality)
const AUTHORS: [(&str, &str, &str); 49] = [
    ("Donald E. Knuth", "Author of The Art of Computer Programming", "USA"),
    ("Andrew S. Tanenbaum", "Operating systems and networking author", "Netherlands"),
    ("Brian W. Kernighan", "Co-author of The C Programming Language", "Canada"),
    ("Dennis M. Ritchie", "Co-creator of C and Unix", "USA"),
    ("Robert Sedgewick", "Algorithms and programming author", "USA"),
    ("Thomas H. Cormen", "Co-author of Introduction to Algorithms", "USA"),
    ("Charles E. Leiserson", "Co-author of Introduction to Algorithms", "USA"),
    ("Ronald L. Rivest", "Co-author of Introduction to Algorithms / RSA", "USA"),
    ("Clifford Stein", "Algorithms researcher", "USA"),
    ("Ian Goodfellow", "Machine learning researcher, GANs", "UK"),
    ("Yoshua Bengio", "Deep learning researcher", "Canada"),
    ("Geoffrey Hinton", "Pioneer in neural networks", "UK"),
    ("Stuart Russell", "AI researcher and textbook author", "UK"),
    ("Peter Norvig", "AI practitioner and author", "USA"),
    ("Edsger W. Dijkstra", "Pioneering CS scientist", "Netherlands"),
    ("Andrew S. Grove", "Computer industry leader", "Hungary"),
    ("Niklaus Wirth", "Pascal creator and CS educator", "Switzerland"),
    ("Michael Sipser", "Theoretical CS author", "USA"),
    ("Alfred Aho", "Compilers pioneer", "USA"),
    ("Jeffrey Ullman", "Databases and compilers", "USA"),
    ("Gerald Jay Sussman", "AI and Scheme author", "USA"),
    ("Ken Thompson", "Unix co-creator", "USA"),
    ("Martin Fowler", "Software engineering author", "UK"),
    ("Fred Brooks", "Software engineering pioneer", "USA"),
    ("Barbara Liskov", "Programming languages and systems", "USA"),
    ("David Patterson", "Computer architecture", "USA"),
    ("John Hennessy", "Computer architecture", "USA"),
    ("John McCarthy", "AI pioneer", "USA"),
    ("Marvin Minsky", "AI pioneer", "USA"),
    ("Richard Stevens", "Networking author", "USA"),
    ("W. Richard Stevens", "UNIX and networking author", "USA"),
    ("Ravi Sethi", "Compilers and theory", "USA"),
    ("Sanjay Ghemawat", "Distributed systems engineer", "USA"),
    ("Leslie Lamport", "Distributed systems researcher", "USA"),
    ("Tim Berners-Lee", "Inventor of the World Wide Web", "UK"),
    ("Donald Norman", "HCI author", "USA"),
    ("Tanenbaum, A.S.", "Educational author", "Netherlands"),
    ("Eli Budur", "Technical writer", "USA"),
    ("Nickolai Zeldovich", "Systems researcher", "USA"),
    ("Seth Bergman", "Education", "USA"),
    ("Rachel Potvin", "Software engineering", "Canada"),
    ("Yann LeCun", "AI researcher", "France"),
    ("Christopher Bishop", "Pattern recognition and ML", "UK"),
    ("Judea Pearl", "Causality researcher", "USA"),
    ("Michael Stonebraker", "Databases researcher", "USA"),
    ("Eric Evans", "Domain-driven design", "USA"),
    ("Sedgewick, R.", "Algorithms", "USA"),
    ("Gayle Laakmann McDowell", "Career and interview books", "USA"),
    ("Jon Kleinberg", "Algorithms and networks", "USA"),
];

/// (title, category, author, publication year)
const SAMPLE_BOOKS: [(&str, &str, &str, i32); 48] = [
    ("The Art of Computer Programming, Vol. 1", "Algorithms", "Donald E. Knuth", 1968),
    ("The Art of Computer Programming, Vol. 2", "Algorithms", "Donald E. Knuth", 1969),
    ("The Art of Computer Programming, Vol. 3", "Algorithms", "Donald E. Knuth", 1973),
    ("Introduction to Algorithms", "Algorithms", "Thomas H. Cormen", 2009),
    ("Algorithms (4th Edition)", "Algorithms", "Robert Sedgewick", 2011),
    ("Operating Systems: Design and Implementation", "Operating Systems", "Andrew S. Tanenbaum", 2006),
    ("Modern Operating Systems", "Operating Systems", "Andrew S. Tanenbaum", 2014),
    ("Computer Networks", "Computer Networks", "Andrew S. Tanenbaum", 2010),
    ("TCP/IP Illustrated", "Computer Networks", "W. Richard Stevens", 1994),
    ("The C Programming Language", "Programming Languages", "Brian W. Kernighan", 1988),
    ("The Unix Programming Environment", "Programming Languages", "Brian W. Kernighan", 1984),
    ("Compilers: Principles, Techniques, and Tools", "Compilers", "Alfred Aho", 2006),
    ("Compilers: Principles and Practice", "Compilers", "Ravi Sethi", 2000),
    ("Computer Architecture: A Quantitative Approach", "Computer Architecture", "John Hennessy", 2017),
    ("Computer Organization and Design", "Computer Architecture", "David Patterson", 2017),
    ("Database System Concepts", "Databases", "Jeffrey Ullman", 2016),
    ("Readings in Database Systems", "Databases", "Michael Stonebraker", 2011),
    ("Artificial Intelligence: A Modern Approach", "Artificial Intelligence", "Stuart Russell", 2010),
    ("Artificial Intelligence: Foundations", "Artificial Intelligence", "Peter Norvig", 2011),
    ("Deep Learning", "Machine Learning", "Ian Goodfellow", 2016),
    ("Pattern Recognition and Machine Learning", "Machine Learning", "Christopher Bishop", 2006),
    ("Probabilistic Graphical Models", "Machine Learning", "Judea Pearl", 2009),
    ("Distributed Systems: Concepts and Design", "Distributed Systems", "Leslie Lamport", 2014),
    ("Designing Data-Intensive Applications", "Distributed Systems", "Martin Fowler", 2016),
    ("Introduction to the Theory of Computation", "Theory of Computation", "Michael Sipser", 2012),
    ("Structure and Interpretation of Computer Programs", "Programming Languages", "Gerald Jay Sussman", 1996),
    ("Companion to Computer Graphics", "Graphics", "John Hennessy", 2015),
    ("Computer Graphics: Principles and Practice", "Graphics", "Donald E. Knuth", 2018),
    ("Human-Computer Interaction", "Human-Computer Interaction", "Donald Norman", 2013),
    ("Designing Interfaces", "Human-Computer Interaction", "Donald Norman", 2014),
    ("Security Engineering", "Security", "Ross Anderson", 2008),
    ("Cryptography and Network Security", "Security", "Ronald L. Rivest", 2015),
    ("Algorithms in Bioinformatics", "Algorithms", "Jon Kleinberg", 2012),
    ("Programming Pearls", "Programming Languages", "Jon Bentley", 1999),
    ("Refactoring", "Software Engineering", "Martin Fowler", 2018),
    ("The Mythical Man-Month", "Software Engineering", "Fred Brooks", 1995),
    ("Domain-Driven Design", "Software Engineering", "Eric Evans", 2003),
    ("Clean Code", "Software Engineering", "Robert C. Martin", 2008),
    ("Design Patterns", "Software Engineering", "Erich Gamma", 1995),
    ("Programming Language Pragmatics", "Programming Languages", "Michael L. Scott", 2016),
    ("Database Internals", "Databases", "Alex Petrov", 2019),
    ("Introduction to Information Retrieval", "Databases", "Christopher Manning", 2008),
    ("Web Architecture 101", "Cloud Computing", "Tim Berners-Lee", 2010),
    ("Distributed Systems for Fun and Profit", "Distributed Systems", "Sanjay Ghemawat", 2013),
    ("Site Reliability Engineering", "DevOps", "Rachel Potvin", 2016),
    ("The Pragmatic Programmer", "Software Engineering", "Andy Hunt", 1999),
    ("Cracking the Coding Interview", "Programming Languages", "Gayle Laakmann McDowell", 2015),
    ("Algorithms Unlocked", "Algorithms", "Thomas H. Cormen", 2013),
];

const TEN_BOOKS: [(&str, &str, &str, i32); 10] = [
    ("Intro to Algorithms - Pocket Edition", "Algorithms", "Thomas H. Cormen", 2009),
    ("Practical Machine Learning", "Machine Learning", "Ian Goodfellow", 2018),
    ("Networking Essentials", "Computer Networks", "W. Richard Stevens", 2012),
    ("Modern Databases", "Databases", "Michael Stonebraker", 2017),
    ("Operating Systems in Practice", "Operating Systems", "Andrew S. Tanenbaum", 2015),
    ("Clean Architecture", "Software Engineering", "Robert C. Martin", 2017),
    ("Hands-On Cloud", "Cloud Computing", "Tim Berners-Lee", 2020),
    ("Security Principles", "Security", "Ross Anderson", 2014),
    ("Compiler Construction Guide", "Compilers", "Alfred Aho", 2011),
    ("Design Patterns Explained", "Software Engineering", "Erich Gamma", 2002),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub added: usize,
    pub titles: Vec<String>,
}

/// Inserts the sample catalog when no author, category or book exists yet.
///
/// Returns the counts that were inserted, or `None` when the catalog already
/// holds data.
pub fn seed_if_empty(catalog: &dyn CatalogManager) -> Result<Option<CatalogCounts>> {
    if !catalog.counts()?.is_empty() {
        log::info!("catalog already holds data, skipping seed");
        return Ok(None);
    }

    let mut categories: Vec<Category> = Vec::with_capacity(CATEGORIES.len());
    for name in CATEGORIES {
        categories.push(catalog.create_category(CategoryCreate {
            name: name.to_string(),
            description: Some(format!("{name} books and resources")),
        })?);
    }

    let mut authors: Vec<Author> = Vec::with_capacity(AUTHORS.len());
    for (name, bio, nationality) in AUTHORS {
        authors.push(catalog.create_author(AuthorCreate {
            name: name.to_string(),
            bio: Some(bio.to_string()),
            nationality: Some(nationality.to_string()),
        })?);
    }

    let mut isbn_counter = 1000;
    let mut books = 0;

    for (title, category_name, author_name, year) in SAMPLE_BOOKS {
        let author = match authors.iter().find(|a| a.name == author_name) {
            Some(author) => author.clone(),
            None => {
                let author = catalog.create_author(AuthorCreate {
                    name: author_name.to_string(),
                    bio: Some(format!("Author of {title}")),
                    nationality: Some("Unknown".to_string()),
                })?;
                authors.push(author.clone());
                author
            }
        };

        let category = match categories.iter().find(|c| c.name == category_name) {
            Some(category) => category.clone(),
            None => {
                let category = catalog.create_category(CategoryCreate {
                    name: category_name.to_string(),
                    description: Some(format!("{category_name} resources")),
                })?;
                categories.push(category.clone());
                category
            }
        };

        let isbn = format!("978-0-{isbn_counter}");
        isbn_counter += 1;

        catalog.create_book(BookCreate {
            title: title.to_string(),
            isbn,
            description: Some(format!("A classic book: {title}")),
            price: 39.99,
            stock_quantity: 10 + (isbn_counter % 20),
            publication_year: Some(year),
            pages: Some(200 + (isbn_counter % 300)),
            language: Some("English".to_string()),
            author_id: author.id,
            category_id: category.id,
        })?;
        books += 1;
    }

    let current_year = Utc::now().year();
    while books < SEED_BOOK_COUNT {
        let n = books as i32;
        let title = format!("Computer Science Essentials Vol. {}", books + 1);
        let category = &categories[books % CATEGORIES.len()];
        let author = &authors[books % authors.len()];

        let isbn = format!("978-0-{isbn_counter}");
        isbn_counter += 1;

        catalog.create_book(BookCreate {
            description: Some(format!("Introductory text for {title}")),
            title,
            isbn,
            price: 29.99,
            stock_quantity: 5 + (n % 30),
            publication_year: Some(current_year - (n % 10)),
            pages: Some(150 + (n % 250)),
            language: Some("English".to_string()),
            author_id: author.id.clone(),
            category_id: category.id.clone(),
        })?;
        books += 1;
    }

    let counts = catalog.counts()?;
    log::info!(
        "seeded {} authors, {} categories and {} books",
        counts.authors,
        counts.categories,
        counts.books
    );
    Ok(Some(counts))
}

/// Adds ten more sample books, skipping ISBNs that already exist. Authors and
/// categories are looked up by name and created when missing.
pub fn seed_ten_books(catalog: &dyn CatalogManager) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for (i, (title, category_name, author_name, year)) in TEN_BOOKS.into_iter().enumerate() {
        let author = match catalog.find_author_by_name(author_name)? {
            Some(author) => author,
            None => catalog.create_author(AuthorCreate {
                name: author_name.to_string(),
                bio: Some("Auto-seeded author".to_string()),
                nationality: Some("Unknown".to_string()),
            })?,
        };

        let category = match catalog.find_category_by_name(category_name)? {
            Some(category) => category,
            None => catalog.create_category(CategoryCreate {
                name: category_name.to_string(),
                description: Some(format!("{category_name} books")),
            })?,
        };

        let isbn = format!("978-1-{}", 9000 + i);
        if crate::catalog::optional(catalog.book_by_isbn(&isbn))?.is_some() {
            log::debug!("sample book {isbn} already present");
            continue;
        }

        let book = catalog.create_book(BookCreate {
            title: title.to_string(),
            isbn,
            description: Some(format!("Seeded: {title}")),
            price: 34.99,
            stock_quantity: 20,
            publication_year: Some(year),
            pages: Some(180),
            language: Some("English".to_string()),
            author_id: author.id,
            category_id: category.id,
        })?;

        report.added += 1;
        report.titles.push(book.title);
    }

    log::info!("added {} sample books", report.added);
    Ok(report)
}
