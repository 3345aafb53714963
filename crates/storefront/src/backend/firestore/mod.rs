//! Firestore REST backend implementation.
//!
//! Uses `reqwest` against the document API and caches catalog reads with
//! `moka` (5-minute TTL). Cart and order collections are never cached -
//! they are mutable per-user state and staleness there corrupts the
//! reconciler's view.

mod convert;
mod wire;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::{debug, instrument};

use paper_lantern_core::{BookId, CartItemId, GenreId, OrderId, UserId};

use super::{Backend, BackendError};
use crate::models::{Book, BookPatch, CartItem, Genre, NewBook, Order};
use convert::{
    book_fields, book_from_doc, book_patch_fields, cart_item_fields, cart_item_from_doc,
    genre_fields, genre_from_doc, order_fields, order_from_doc,
};
use wire::{ApiErrorBody, Document, ListDocumentsResponse, RunQueryItem, Value, eq_query};

const CACHE_TTL: Duration = Duration::from_secs(300);
const LIST_PAGE_SIZE: u32 = 300;

/// Configuration for the Firestore backend.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Cloud project ID.
    pub project_id: String,
    /// Database name, usually `(default)`.
    pub database: String,
    /// API origin; override to point at an emulator.
    pub base_url: String,
}

impl FirestoreConfig {
    /// Root URL for the documents resource.
    #[must_use]
    pub fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.database
        )
    }
}

#[derive(Clone)]
enum CacheValue {
    Book(Box<Book>),
    Books(Vec<Book>),
    Genres(Vec<Genre>),
}

/// Client for the Firestore REST document API.
#[derive(Clone)]
pub struct FirestoreBackend {
    inner: Arc<FirestoreBackendInner>,
}

struct FirestoreBackendInner {
    client: reqwest::Client,
    documents_url: String,
    cache: Cache<String, CacheValue>,
}

impl FirestoreBackend {
    /// Create a new backend from configuration.
    #[must_use]
    pub fn new(config: &FirestoreConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(FirestoreBackendInner {
                client: reqwest::Client::new(),
                documents_url: config.documents_url(),
                cache,
            }),
        }
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.inner.documents_url)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.inner.documents_url)
    }

    /// Convert a non-success response into a typed error.
    async fn error_for(response: reqwest::Response, context: &str) -> BackendError {
        let status = response.status();
        let body: ApiErrorBody = response.json().await.unwrap_or_default();
        let message = if body.error.message.is_empty() {
            format!("{context}: HTTP {status}")
        } else {
            format!("{context}: {}", body.error.message)
        };

        if status == reqwest::StatusCode::NOT_FOUND {
            BackendError::NotFound(message)
        } else {
            BackendError::Rejected(message)
        }
    }

    async fn get_doc(&self, collection: &str, id: &str) -> Result<Document, BackendError> {
        let response = self
            .inner
            .client
            .get(self.doc_url(collection, id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, &format!("{collection}/{id}")).await);
        }

        Ok(response.json().await?)
    }

    async fn create_doc(
        &self,
        collection: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<String, BackendError> {
        let response = self
            .inner
            .client
            .post(self.collection_url(collection))
            .json(&Document::from_fields(fields))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, &format!("create {collection}")).await);
        }

        let created: Document = response.json().await?;
        created
            .doc_id()
            .map(str::to_owned)
            .ok_or_else(|| BackendError::Corrupt("created document has no name".to_string()))
    }

    async fn patch_doc(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<(), BackendError> {
        // updateMask limits the write to the submitted fields; the existence
        // precondition turns a patch of a deleted document into NotFound.
        let mut query: Vec<(String, String)> =
            vec![("currentDocument.exists".to_string(), "true".to_string())];
        for field in fields.keys() {
            query.push(("updateMask.fieldPaths".to_string(), field.clone()));
        }

        let response = self
            .inner
            .client
            .patch(self.doc_url(collection, id))
            .query(&query)
            .json(&Document::from_fields(fields))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, &format!("update {collection}/{id}")).await);
        }

        Ok(())
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .delete(self.doc_url(collection, id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, &format!("delete {collection}/{id}")).await);
        }

        Ok(())
    }

    /// Run an equality query and return the matched documents.
    async fn run_eq_query(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        limit: Option<i32>,
    ) -> Result<Vec<Document>, BackendError> {
        let response = self
            .inner
            .client
            .post(format!("{}:runQuery", self.inner.documents_url))
            .json(&eq_query(collection, field, value, limit))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, &format!("query {collection}")).await);
        }

        let items: Vec<RunQueryItem> = response.json().await?;
        Ok(items.into_iter().filter_map(|item| item.document).collect())
    }

    /// List every document in a collection, following page tokens.
    async fn list_collection(&self, collection: &str) -> Result<Vec<Document>, BackendError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .inner
                .client
                .get(self.collection_url(collection))
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(Self::error_for(response, &format!("list {collection}")).await);
            }

            let page: ListDocumentsResponse = response.json().await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    /// Catalog writes are rare admin operations; dropping the whole cache
    /// is simpler than tracking which genre listings a book touched.
    async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

impl Backend for FirestoreBackend {
    #[instrument(skip(self), fields(user = %user))]
    async fn list_cart_items(&self, user: &UserId) -> Result<Vec<CartItem>, BackendError> {
        let docs = self
            .run_eq_query("carts", "userId", Value::string(user.as_str()), None)
            .await?;
        docs.iter().map(cart_item_from_doc).collect()
    }

    #[instrument(skip(self), fields(book = %id))]
    async fn get_book(&self, id: &BookId) -> Result<Book, BackendError> {
        let cache_key = format!("book:{id}");
        if let Some(CacheValue::Book(book)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for book");
            return Ok(*book);
        }

        let doc = self.get_doc("books", id.as_str()).await?;
        let book = book_from_doc(&doc)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Book(Box::new(book.clone())))
            .await;

        Ok(book)
    }

    #[instrument(skip(self), fields(user = %user, book = %book))]
    async fn create_order(
        &self,
        user: &UserId,
        book: &BookId,
        quantity: u32,
        created_at: DateTime<Utc>,
    ) -> Result<OrderId, BackendError> {
        let id = self
            .create_doc("orders", order_fields(user, book, quantity, created_at))
            .await?;
        Ok(OrderId::new(id))
    }

    #[instrument(skip(self), fields(cart_item = %id))]
    async fn delete_cart_item(&self, id: &CartItemId) -> Result<(), BackendError> {
        self.delete_doc("carts", id.as_str()).await
    }

    #[instrument(skip(self), fields(user = %user, book = %book))]
    async fn add_cart_item(
        &self,
        user: &UserId,
        book: &BookId,
        quantity: u32,
    ) -> Result<CartItemId, BackendError> {
        let id = self
            .create_doc("carts", cart_item_fields(user, book, quantity))
            .await?;
        Ok(CartItemId::new(id))
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn list_orders(&self, user: &UserId) -> Result<Vec<Order>, BackendError> {
        let docs = self
            .run_eq_query("orders", "userId", Value::string(user.as_str()), None)
            .await?;
        docs.iter().map(order_from_doc).collect()
    }

    #[instrument(skip(self))]
    async fn list_books(&self) -> Result<Vec<Book>, BackendError> {
        let cache_key = "books:all".to_string();
        if let Some(CacheValue::Books(books)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for books");
            return Ok(books);
        }

        let docs = self.list_collection("books").await?;
        let books = docs
            .iter()
            .map(book_from_doc)
            .collect::<Result<Vec<_>, _>>()?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Books(books.clone()))
            .await;

        Ok(books)
    }

    #[instrument(skip(self))]
    async fn list_books_by_genre(&self, genre: &str) -> Result<Vec<Book>, BackendError> {
        let cache_key = format!("books:genre:{genre}");
        if let Some(CacheValue::Books(books)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for genre books");
            return Ok(books);
        }

        let docs = self
            .run_eq_query("books", "bookGenre", Value::string(genre), None)
            .await?;
        let books = docs
            .iter()
            .map(book_from_doc)
            .collect::<Result<Vec<_>, _>>()?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Books(books.clone()))
            .await;

        Ok(books)
    }

    #[instrument(skip(self))]
    async fn list_genres(&self) -> Result<Vec<Genre>, BackendError> {
        let cache_key = "genres".to_string();
        if let Some(CacheValue::Genres(genres)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for genres");
            return Ok(genres);
        }

        let docs = self.list_collection("bookGenre").await?;
        let genres = docs
            .iter()
            .map(genre_from_doc)
            .collect::<Result<Vec<_>, _>>()?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Genres(genres.clone()))
            .await;

        Ok(genres)
    }

    #[instrument(skip(self))]
    async fn find_genre(&self, name: &str) -> Result<Option<Genre>, BackendError> {
        let docs = self
            .run_eq_query("bookGenre", "genre", Value::string(name), Some(1))
            .await?;
        docs.first().map(genre_from_doc).transpose()
    }

    #[instrument(skip(self))]
    async fn create_genre(&self, name: &str) -> Result<GenreId, BackendError> {
        let id = self.create_doc("bookGenre", genre_fields(name)).await?;
        self.invalidate_catalog().await;
        Ok(GenreId::new(id))
    }

    #[instrument(skip(self, book))]
    async fn create_book(&self, book: NewBook) -> Result<BookId, BackendError> {
        let id = self.create_doc("books", book_fields(&book)).await?;
        self.invalidate_catalog().await;
        Ok(BookId::new(id))
    }

    #[instrument(skip(self, patch), fields(book = %id))]
    async fn update_book(&self, id: &BookId, patch: BookPatch) -> Result<(), BackendError> {
        self.patch_doc("books", id.as_str(), book_patch_fields(&patch))
            .await?;
        self.invalidate_catalog().await;
        Ok(())
    }

    #[instrument(skip(self), fields(book = %id))]
    async fn delete_book(&self, id: &BookId) -> Result<(), BackendError> {
        self.delete_doc("books", id.as_str()).await?;
        self.invalidate_catalog().await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .get(self.collection_url("bookGenre"))
            .query(&[("pageSize", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, "ping").await);
        }

        Ok(())
    }
}
