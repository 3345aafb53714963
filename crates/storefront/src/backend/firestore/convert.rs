//! Conversions between Firestore documents and domain models.
//!
//! Field names follow the collections as they exist in the store:
//! `books` (`bookName`, `bookAuthor`, `bookPrice`, `bookGenre`,
//! `bookImage`), `bookGenre` (`genre`), `carts` (`userId`, `bookId`,
//! `quantity`), `orders` (`userId`, `bookId`, `quantity`, `createdAt`).
//!
//! Reads are lenient where the historic data is sloppy (prices as strings
//! or numbers); writes always emit the normalized representation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use paper_lantern_core::{BookId, CartItemId, GenreId, OrderId, Price, UserId};

use super::wire::{Document, Value};
use crate::backend::BackendError;
use crate::models::{Book, BookPatch, CartItem, Genre, NewBook, Order};

fn require_id(doc: &Document) -> Result<&str, BackendError> {
    doc.doc_id()
        .ok_or_else(|| BackendError::Corrupt("document has no resource name".to_string()))
}

fn require_str(doc: &Document, field: &str) -> Result<String, BackendError> {
    doc.field(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| BackendError::Corrupt(format!("missing string field: {field}")))
}

fn require_quantity(doc: &Document) -> Result<u32, BackendError> {
    let raw = doc
        .field("quantity")
        .and_then(Value::as_i64)
        .ok_or_else(|| BackendError::Corrupt("missing integer field: quantity".to_string()))?;
    u32::try_from(raw)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| BackendError::Corrupt(format!("quantity out of range: {raw}")))
}

pub fn book_from_doc(doc: &Document) -> Result<Book, BackendError> {
    let price_raw = doc
        .field("bookPrice")
        .map(Value::as_json)
        .unwrap_or(serde_json::Value::Null);
    let price = Price::parse_lenient(&price_raw)
        .map_err(|e| BackendError::Corrupt(format!("bookPrice: {e}")))?;

    Ok(Book {
        id: BookId::new(require_id(doc)?),
        name: require_str(doc, "bookName")?,
        author: require_str(doc, "bookAuthor")?,
        price,
        genre: require_str(doc, "bookGenre")?,
        cover_image: doc
            .field("bookImage")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
    })
}

pub fn genre_from_doc(doc: &Document) -> Result<Genre, BackendError> {
    Ok(Genre {
        id: GenreId::new(require_id(doc)?),
        name: require_str(doc, "genre")?,
    })
}

pub fn cart_item_from_doc(doc: &Document) -> Result<CartItem, BackendError> {
    Ok(CartItem {
        id: CartItemId::new(require_id(doc)?),
        user_id: UserId::new(require_str(doc, "userId")?),
        book_id: BookId::new(require_str(doc, "bookId")?),
        quantity: require_quantity(doc)?,
    })
}

pub fn order_from_doc(doc: &Document) -> Result<Order, BackendError> {
    let created_at = doc
        .field("createdAt")
        .and_then(Value::as_timestamp)
        .ok_or_else(|| BackendError::Corrupt("missing timestamp field: createdAt".to_string()))?;

    Ok(Order {
        id: OrderId::new(require_id(doc)?),
        user_id: UserId::new(require_str(doc, "userId")?),
        book_id: BookId::new(require_str(doc, "bookId")?),
        quantity: require_quantity(doc)?,
        created_at,
    })
}

pub fn book_fields(book: &NewBook) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert("bookName".to_string(), Value::string(&book.name));
    fields.insert("bookAuthor".to_string(), Value::string(&book.author));
    fields.insert(
        "bookPrice".to_string(),
        Value::string(book.price.to_string()),
    );
    fields.insert("bookGenre".to_string(), Value::string(&book.genre));
    if let Some(image) = &book.cover_image {
        fields.insert("bookImage".to_string(), Value::string(image));
    }
    fields
}

pub fn book_patch_fields(patch: &BookPatch) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert("bookName".to_string(), Value::string(&patch.name));
    fields.insert("bookAuthor".to_string(), Value::string(&patch.author));
    fields.insert(
        "bookPrice".to_string(),
        Value::string(patch.price.to_string()),
    );
    fields.insert("bookGenre".to_string(), Value::string(&patch.genre));
    fields
}

pub fn genre_fields(name: &str) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert("genre".to_string(), Value::string(name));
    fields
}

pub fn cart_item_fields(user: &UserId, book: &BookId, quantity: u32) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert("userId".to_string(), Value::string(user.as_str()));
    fields.insert("bookId".to_string(), Value::string(book.as_str()));
    fields.insert("quantity".to_string(), Value::integer(i64::from(quantity)));
    fields
}

pub fn order_fields(
    user: &UserId,
    book: &BookId,
    quantity: u32,
    created_at: DateTime<Utc>,
) -> BTreeMap<String, Value> {
    let mut fields = cart_item_fields(user, book, quantity);
    fields.insert("createdAt".to_string(), Value::timestamp(created_at));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, fields: serde_json::Value) -> Document {
        serde_json::from_value(serde_json::json!({
            "name": format!("projects/p/databases/(default)/documents/{name}"),
            "fields": fields,
        }))
        .expect("document")
    }

    #[test]
    fn test_book_with_string_price() {
        let book = book_from_doc(&doc(
            "books/b1",
            serde_json::json!({
                "bookName": { "stringValue": "Dune" },
                "bookAuthor": { "stringValue": "Frank Herbert" },
                "bookPrice": { "stringValue": "12.99" },
                "bookGenre": { "stringValue": "Sci-Fi" },
            }),
        ))
        .expect("book");
        assert_eq!(book.id.as_str(), "b1");
        assert_eq!(book.price, Price::from_cents(1299));
        assert_eq!(book.cover_image, None);
    }

    #[test]
    fn test_book_with_numeric_price() {
        let book = book_from_doc(&doc(
            "books/b2",
            serde_json::json!({
                "bookName": { "stringValue": "Emma" },
                "bookAuthor": { "stringValue": "Jane Austen" },
                "bookPrice": { "doubleValue": 8.5 },
                "bookGenre": { "stringValue": "Classic" },
                "bookImage": { "stringValue": "https://img.example/emma.jpg" },
            }),
        ))
        .expect("book");
        assert_eq!(book.price, Price::from_cents(850));
        assert_eq!(
            book.cover_image.as_deref(),
            Some("https://img.example/emma.jpg")
        );
    }

    #[test]
    fn test_book_missing_field_is_corrupt() {
        let err = book_from_doc(&doc(
            "books/b3",
            serde_json::json!({
                "bookName": { "stringValue": "Untitled" },
            }),
        ))
        .expect_err("corrupt");
        assert!(matches!(err, BackendError::Corrupt(_)));
    }

    #[test]
    fn test_cart_item_rejects_zero_quantity() {
        let err = cart_item_from_doc(&doc(
            "carts/c1",
            serde_json::json!({
                "userId": { "stringValue": "u1" },
                "bookId": { "stringValue": "b1" },
                "quantity": { "integerValue": "0" },
            }),
        ))
        .expect_err("zero quantity");
        assert!(matches!(err, BackendError::Corrupt(_)));
    }

    #[test]
    fn test_order_roundtrip_through_fields() {
        let now = Utc::now();
        let fields = order_fields(&UserId::new("u1"), &BookId::new("b1"), 2, now);
        let document = Document {
            name: Some("projects/p/databases/(default)/documents/orders/o1".to_string()),
            fields,
        };
        let order = order_from_doc(&document).expect("order");
        assert_eq!(order.id.as_str(), "o1");
        assert_eq!(order.quantity, 2);
        assert_eq!(order.created_at.timestamp(), now.timestamp());
    }
}
