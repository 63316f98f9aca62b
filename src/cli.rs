use clap::{Parser, Subcommand};

use crate::app::App;
use crate::catalog::BookQuery;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the bookstore api server.
    Daemon {},

    /// Insert the sample catalog if the catalog is empty
    Seed {
        /// Also add the ten extra sample books
        #[clap(long, default_value = "false")]
        ten_books: bool,
    },

    /// Recompute book embeddings
    Recompute {
        /// Recompute books that already have an embedding too
        #[clap(short, long, default_value = "false")]
        force: bool,
    },

    /// Recompute the embedding of a single book
    Embed {
        /// Book id
        id: String,
    },

    /// Books similar to the given one
    Recommend {
        /// Book id
        id: String,

        #[clap(short, long, default_value_t = crate::semantic::DEFAULT_RECOMMENDATION_LIMIT)]
        limit: usize,
    },

    /// Semantic search over book embeddings
    Search {
        /// Free text query
        query: String,

        #[clap(short, long, default_value_t = crate::semantic::DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },

    /// List books
    Books {
        /// Case-insensitive title substring
        #[clap(short, long)]
        title: Option<String>,

        /// Author id
        #[clap(long)]
        author_id: Option<String>,

        /// Category id
        #[clap(long)]
        category_id: Option<String>,

        #[clap(long)]
        min_price: Option<f64>,

        #[clap(long)]
        max_price: Option<f64>,

        /// Page number, starting at 0
        #[clap(short, long)]
        page: Option<usize>,

        /// Page size
        #[clap(short, long)]
        size: Option<usize>,

        /// Field to order by, e.g. title, price, publicationYear
        #[clap(long)]
        sort_by: Option<String>,

        /// asc or desc
        #[clap(long)]
        sort_dir: Option<String>,
    },

    /// Show catalog counts
    Stats {},
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs a one-shot command against the local catalog.
pub fn run(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Daemon {} => anyhow::bail!("the daemon is not a one-shot command"),

        Command::Seed { ten_books } => {
            match app.seed_if_empty()? {
                Some(counts) => print_json(&counts)?,
                None => eprintln!("catalog already holds data, nothing seeded"),
            }
            if ten_books {
                print_json(&app.seed_ten_books()?)?;
            }
        }

        Command::Recompute { force } => {
            let report = app.recompute_embeddings(force)?;
            print_json(&report)?;
        }

        Command::Embed { id } => {
            let book = app.compute_embedding(&id)?;
            eprintln!("updated embedding of \"{}\"", book.title);
        }

        Command::Recommend { id, limit } => {
            print_json(&app.recommend(&id, limit)?)?;
        }

        Command::Search { query, limit } => {
            print_json(&app.semantic_search(&query, limit)?)?;
        }

        Command::Books {
            title,
            author_id,
            category_id,
            min_price,
            max_price,
            page,
            size,
            sort_by,
            sort_dir,
        } => {
            let query = BookQuery {
                title,
                author_id: author_id.map(Into::into),
                category_id: category_id.map(Into::into),
                min_price,
                max_price,
                max_stock: None,
                page,
                size,
                sort_by,
                sort_dir,
            };
            print_json(&app.search_books(&query)?)?;
        }

        Command::Stats {} => {
            print_json(&app.stats()?)?;
        }
    }

    Ok(())
}
