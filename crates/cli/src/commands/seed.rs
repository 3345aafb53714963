//! Seed the catalog from a YAML file.
//!
//! The file lists books with their genre names; genres are created lazily
//! the same way the admin flow does, so seeding and the admin form leave
//! the store in the same shape.

use serde::Deserialize;
use tracing::info;

use paper_lantern_core::Price;
use paper_lantern_storefront::backend::Backend;
use paper_lantern_storefront::models::NewBook;

/// One book entry in the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedBook {
    pub name: String,
    pub author: String,
    /// Decimal string, e.g. `"12.99"`.
    pub price: Price,
    pub genre: String,
    #[serde(default)]
    pub cover_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCatalog {
    pub books: Vec<SeedBook>,
}

/// Seed books and genres from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if a store
/// write fails. Already-seeded books abort the batch only when
/// `skip_existing` is false.
pub async fn catalog(
    file_path: &str,
    skip_existing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = tokio::fs::read_to_string(file_path).await?;
    let seed: SeedCatalog = serde_yaml::from_str(&content)?;
    info!(path = %file_path, books = seed.books.len(), "Parsed seed file");

    let backend = super::backend_from_env()?;

    let existing: Vec<String> = if skip_existing {
        backend
            .list_books()
            .await?
            .into_iter()
            .map(|book| book.name)
            .collect()
    } else {
        Vec::new()
    };

    let mut created = 0usize;
    let mut skipped = 0usize;

    for book in seed.books {
        if existing.contains(&book.name) {
            info!(name = %book.name, "Already present, skipping");
            skipped += 1;
            continue;
        }

        if backend.find_genre(&book.genre).await?.is_none() {
            backend.create_genre(&book.genre).await?;
            info!(genre = %book.genre, "Created genre");
        }

        let id = backend
            .create_book(NewBook {
                name: book.name.clone(),
                author: book.author,
                price: book.price,
                genre: book.genre,
                cover_image: book.cover_image,
            })
            .await?;
        info!(name = %book.name, %id, "Created book");
        created += 1;
    }

    info!(created, skipped, "Seeding complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_file_parses() {
        let yaml = r#"
books:
  - name: "Piranesi"
    author: "Susanna Clarke"
    price: "14.99"
    genre: "Fantasy"
  - name: "Dune"
    author: "Frank Herbert"
    price: "9.99"
    genre: "Science Fiction"
    cover_image: "https://images.example.com/dune.jpg"
"#;
        let seed: SeedCatalog = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(seed.books.len(), 2);
        assert_eq!(seed.books[0].genre, "Fantasy");
        assert!(seed.books[0].cover_image.is_none());
        assert!(seed.books[1].cover_image.is_some());
    }
}
