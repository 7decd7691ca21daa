//! Clients for a PostgREST-style row API and the matching object storage
//! API.

use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;

use crate::{
    error::{StoreError, StoreResult},
    query::{Filter, Query},
    storage::{ImageFile, ObjectStore},
    store::RowStore,
};

#[derive(Clone)]
struct Endpoint {
    client: Client,
    base_url: String,
    key: String,
}

impl Endpoint {
    fn new(base_url: &str, key: &str) -> Self {
        Endpoint {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        }
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.key).bearer_auth(&self.key)
    }
}

async fn check(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("data store returned {status}: {body}");
        Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Row store backed by a PostgREST endpoint (`{base_url}/rest/v1`).
#[derive(Clone)]
pub struct RestStore {
    endpoint: Endpoint,
}

impl RestStore {
    pub fn new(base_url: &str, key: &str) -> Self {
        RestStore {
            endpoint: Endpoint::new(base_url, key),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.endpoint.base_url)
    }

    fn id_filter(id: &str, guard: &[Filter]) -> Vec<(String, String)> {
        std::iter::once(Filter::Eq("id".to_string(), Value::from(id)))
            .chain(guard.iter().cloned())
            .map(|filter| (filter.column().to_string(), filter.operator_expr()))
            .collect()
    }
}

/// Reads the total from a `Content-Range` header such as `0-24/311` or
/// `*/0`.
fn parse_content_range(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.parse().ok()
}

#[rocket::async_trait]
impl RowStore for RestStore {
    #[tracing::instrument(skip(self))]
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>> {
        let request = self
            .endpoint
            .client
            .get(self.table_url(query.table))
            .query(&query.to_pairs());
        let response = check(self.endpoint.authed(request).send().await?).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    #[tracing::instrument(skip(self))]
    async fn count(&self, query: &Query) -> StoreResult<usize> {
        let request = self
            .endpoint
            .client
            .head(self.table_url(query.table))
            .query(&query.to_pairs())
            .header("Prefer", "count=exact");
        let response = check(self.endpoint.authed(request).send().await?).await?;

        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| {
                StoreError::Unexpected(
                    "count response had no usable Content-Range".to_string(),
                )
            })
    }

    #[tracing::instrument(skip(self, row))]
    async fn insert(
        &self,
        table: &'static str,
        row: Value,
    ) -> StoreResult<Value> {
        let request = self
            .endpoint
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = check(self.endpoint.authed(request).send().await?).await?;
        let mut rows = response.json::<Vec<Value>>().await?;
        if rows.is_empty() {
            return Err(StoreError::NoSuchRow {
                table: table.to_string(),
            });
        }
        Ok(rows.swap_remove(0))
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update(
        &self,
        table: &'static str,
        id: &str,
        guard: &[Filter],
        patch: Value,
    ) -> StoreResult<Option<Value>> {
        let request = self
            .endpoint
            .client
            .patch(self.table_url(table))
            .query(&Self::id_filter(id, guard))
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = check(self.endpoint.authed(request).send().await?).await?;
        let rows = response.json::<Vec<Value>>().await?;
        Ok(rows.into_iter().next())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, table: &'static str, id: &str) -> StoreResult<()> {
        let request = self
            .endpoint
            .client
            .delete(self.table_url(table))
            .query(&Self::id_filter(id, &[]));
        check(self.endpoint.authed(request).send().await?).await?;
        Ok(())
    }
}

/// Object storage at `{base_url}/storage/v1`, in a single bucket.
#[derive(Clone)]
pub struct RestObjectStore {
    endpoint: Endpoint,
    bucket: String,
}

impl RestObjectStore {
    pub fn new(base_url: &str, key: &str, bucket: &str) -> Self {
        RestObjectStore {
            endpoint: Endpoint::new(base_url, key),
            bucket: bucket.to_string(),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{path}",
            self.endpoint.base_url, self.bucket
        )
    }
}

#[rocket::async_trait]
impl ObjectStore for RestObjectStore {
    #[tracing::instrument(skip(self, file), fields(bytes = file.bytes.len()))]
    async fn upload(&self, path: &str, file: &ImageFile) -> StoreResult<String> {
        let url = format!(
            "{}/storage/v1/object/{}/{path}",
            self.endpoint.base_url, self.bucket
        );
        let request = self
            .endpoint
            .client
            .post(url)
            .header(header::CONTENT_TYPE, &file.content_type)
            .body(file.bytes.clone());
        check(self.endpoint.authed(request).send().await?).await?;
        Ok(self.public_url(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_range() {
        assert_eq!(parse_content_range("0-24/311"), Some(311));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
    }

    #[test]
    fn test_urls() {
        let store = RestStore::new("https://db.example.com/", "key");
        assert_eq!(
            store.table_url("raffles"),
            "https://db.example.com/rest/v1/raffles"
        );

        let objects =
            RestObjectStore::new("https://db.example.com", "key", "images");
        assert_eq!(
            objects.public_url("1-logo.png"),
            "https://db.example.com/storage/v1/object/public/images/1-logo.png"
        );
    }

    #[test]
    fn test_guarded_id_filter() {
        let pairs = RestStore::id_filter(
            "p1",
            &[Filter::Eq("winner".to_string(), Value::Bool(false))],
        );
        assert_eq!(
            pairs,
            vec![
                ("id".to_string(), "eq.p1".to_string()),
                ("winner".to_string(), "eq.false".to_string()),
            ]
        );
    }
}
