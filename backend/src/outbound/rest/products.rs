//! Product table adapter.

use async_trait::async_trait;

use crate::domain::ports::{ProductRepository, ProductRepositoryError};
use crate::domain::{Product, ProductDraft, ProductId, UserId};

use super::client::{RestClient, RestError, Returning, eq};
use super::rows::{PRODUCTS, ProductRow, ProductWrite, RowError};

/// [`ProductRepository`] backed by the hosted store.
#[derive(Clone)]
pub struct RestProductRepository {
    client: RestClient,
}

impl RestProductRepository {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

fn map_error(error: RestError, draft: Option<&ProductDraft>) -> ProductRepositoryError {
    if error.is_unique_violation() {
        if let Some(draft) = draft {
            return ProductRepositoryError::duplicate_code(draft.new_code.clone());
        }
    }
    if error.is_unavailable() {
        ProductRepositoryError::connection(error.to_string())
    } else {
        ProductRepositoryError::query(error.to_string())
    }
}

fn map_row_error(error: RowError) -> ProductRepositoryError {
    ProductRepositoryError::query(error.to_string())
}

fn single(rows: Vec<ProductRow>, id: &ProductId) -> Result<Product, ProductRepositoryError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| ProductRepositoryError::not_found(id.to_string()))?
        .into_domain()
        .map_err(map_row_error)
}

fn id_filter(id: &ProductId) -> Vec<(&'static str, String)> {
    vec![("id", eq(id)), ("select", "*".to_owned())]
}

fn code_filter(code: &str) -> Vec<(&'static str, String)> {
    vec![("new_code", eq(code)), ("select", "*".to_owned())]
}

#[async_trait]
impl ProductRepository for RestProductRepository {
    async fn list(&self) -> Result<Vec<Product>, ProductRepositoryError> {
        let rows: Vec<ProductRow> = self
            .client
            .select(
                PRODUCTS,
                &[
                    ("select", "*".to_owned()),
                    ("order", "created_at.desc".to_owned()),
                ],
            )
            .await
            .map_err(|err| map_error(err, None))?;
        rows.into_iter()
            .map(|row| row.into_domain().map_err(map_row_error))
            .collect()
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, ProductRepositoryError> {
        let row: Option<ProductRow> = self
            .client
            .select_one(PRODUCTS, &id_filter(id))
            .await
            .map_err(|err| map_error(err, None))?;
        row.map(|row| row.into_domain().map_err(map_row_error))
            .transpose()
    }

    async fn insert(
        &self,
        draft: &ProductDraft,
        created_by: Option<UserId>,
    ) -> Result<Product, ProductRepositoryError> {
        let rows: Vec<ProductRow> = self
            .client
            .insert(
                PRODUCTS,
                &[ProductWrite::new(draft, created_by)],
                Returning::Representation,
            )
            .await
            .map_err(|err| map_error(err, Some(draft)))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ProductRepositoryError::query("insert returned no row"))?
            .into_domain()
            .map_err(map_row_error)
    }

    async fn insert_batch(
        &self,
        drafts: &[ProductDraft],
        created_by: Option<UserId>,
    ) -> Result<usize, ProductRepositoryError> {
        if drafts.is_empty() {
            return Ok(0);
        }
        let body: Vec<ProductWrite<'_>> = drafts
            .iter()
            .map(|draft| ProductWrite::new(draft, created_by))
            .collect();
        let _: Vec<serde_json::Value> = self
            .client
            .insert(PRODUCTS, &body, Returning::Minimal)
            .await
            .map_err(|err| {
                if err.is_unique_violation() {
                    ProductRepositoryError::query(format!(
                        "batch rejected by unique constraint: {err}"
                    ))
                } else {
                    map_error(err, None)
                }
            })?;
        Ok(drafts.len())
    }

    /// Update the row holding the draft's code, keeping its creator, or
    /// insert a new row when the code is free.
    async fn upsert_by_code(
        &self,
        draft: &ProductDraft,
        created_by: Option<UserId>,
    ) -> Result<Product, ProductRepositoryError> {
        let updated: Vec<ProductRow> = self
            .client
            .update(PRODUCTS, &code_filter(&draft.new_code), &ProductWrite::new(draft, None))
            .await
            .map_err(|err| map_error(err, Some(draft)))?;
        if let Some(row) = updated.into_iter().next() {
            return row.into_domain().map_err(map_row_error);
        }
        self.insert(draft, created_by).await
    }

    async fn update(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, ProductRepositoryError> {
        let rows: Vec<ProductRow> = self
            .client
            .update(PRODUCTS, &id_filter(id), &ProductWrite::new(draft, None))
            .await
            .map_err(|err| map_error(err, Some(draft)))?;
        single(rows, id)
    }

    async fn delete(&self, id: &ProductId) -> Result<(), ProductRepositoryError> {
        let rows: Vec<ProductRow> = self
            .client
            .delete(PRODUCTS, &id_filter(id))
            .await
            .map_err(|err| map_error(err, None))?;
        single(rows, id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use actix_web::dev::ServerHandle;
    use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
    use rstest::rstest;
    use serde_json::{Value, json};
    use url::Url;
    use uuid::Uuid;

    use crate::outbound::rest::RestSettings;

    const ORIGINAL_CREATOR: &str = "5b1f7c3e-2d4a-4f10-9a51-0c2e8d7b6a11";

    /// Requests seen by [`FakeStore`], as method and JSON body.
    type Requests = Arc<Mutex<Vec<(String, Value)>>>;

    /// Minimal stand-in for the hosted products table. PATCH matches a
    /// stored row only when `code_exists`; POST echoes the sent creator.
    struct FakeStore {
        repo: RestProductRepository,
        requests: Requests,
        handle: ServerHandle,
    }

    fn row_json(code: &str, created_by: Option<&str>) -> Value {
        json!({
            "id": "7d7c1f7e-8a40-4c55-a0f4-0f6a0b7ad001",
            "old_code": null,
            "new_code": code,
            "description": null,
            "sequence_number": null,
            "name": "Antimo Sirsak",
            "wholesale_price_notes": null,
            "retail_price_notes": null,
            "stock": 9,
            "category": null,
            "created_at": "2026-01-05T08:00:00Z",
            "updated_at": "2026-01-06T08:00:00Z",
            "created_by": created_by,
        })
    }

    impl FakeStore {
        fn start(code_exists: bool) -> Self {
            let requests = Requests::default();
            let log = Arc::clone(&requests);
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind fake store");
            let addr = listener.local_addr().expect("fake store addr");
            let server = HttpServer::new(move || {
                let log = Arc::clone(&log);
                App::new().default_service(web::to(move |req: HttpRequest, body: web::Bytes| {
                    let log = Arc::clone(&log);
                    async move {
                        let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                        let method = req.method().to_string();
                        let rows = match method.as_str() {
                            "PATCH" if code_exists => {
                                vec![row_json("J001", Some(ORIGINAL_CREATOR))]
                            }
                            "PATCH" => Vec::new(),
                            _ => vec![row_json("J001", payload[0]["created_by"].as_str())],
                        };
                        log.lock().expect("request log").push((method, payload));
                        HttpResponse::Ok().json(rows)
                    }
                }))
            })
            .workers(1)
            .listen(listener)
            .expect("listen")
            .disable_signals()
            .run();
            let handle = server.handle();
            actix_web::rt::spawn(server);
            let client = RestClient::new(RestSettings {
                base_url: Url::parse(&format!("http://{addr}/")).expect("store url"),
                api_key: "anon".to_owned(),
                timeout: Duration::from_secs(5),
            })
            .expect("rest client");
            Self {
                repo: RestProductRepository::new(client),
                requests,
                handle,
            }
        }

        fn requests(&self) -> Vec<(String, Value)> {
            self.requests.lock().expect("request log").clone()
        }
    }

    fn importer() -> UserId {
        UserId::from_uuid(Uuid::new_v4())
    }

    fn draft() -> ProductDraft {
        ProductDraft {
            new_code: "J001".into(),
            name: "Antimo Sirsak".into(),
            stock: 9,
            ..ProductDraft::default()
        }
    }

    #[actix_web::test]
    async fn upsert_of_existing_code_keeps_the_creator() {
        let store = FakeStore::start(true);

        let product = store
            .repo
            .upsert_by_code(&draft(), Some(importer()))
            .await
            .expect("upsert");

        let requests = store.requests();
        assert_eq!(requests.len(), 1);
        let (method, body) = requests.first().expect("one request");
        assert_eq!(method, "PATCH");
        assert!(body.get("created_by").is_none(), "{body}");
        assert_eq!(
            product.created_by.map(|id| id.as_uuid().to_string()).as_deref(),
            Some(ORIGINAL_CREATOR)
        );
        store.handle.stop(true).await;
    }

    #[actix_web::test]
    async fn upsert_of_free_code_inserts_with_the_creator() {
        let store = FakeStore::start(false);
        let importer = importer();

        let product = store
            .repo
            .upsert_by_code(&draft(), Some(importer))
            .await
            .expect("upsert");

        let methods: Vec<String> = store.requests().into_iter().map(|(method, _)| method).collect();
        assert_eq!(methods, vec!["PATCH", "POST"]);
        assert_eq!(product.created_by, Some(importer));
        store.handle.stop(true).await;
    }

    fn status(status: u16, code: Option<&str>) -> RestError {
        RestError::Status {
            status,
            code: code.map(str::to_owned),
            message: "boom".to_owned(),
        }
    }

    #[rstest]
    fn unique_violation_names_the_code() {
        let draft = ProductDraft {
            new_code: "J005".into(),
            ..ProductDraft::default()
        };
        let err = map_error(status(409, Some("23505")), Some(&draft));
        assert_eq!(err, ProductRepositoryError::duplicate_code("J005"));
    }

    #[rstest]
    #[case::transport(RestError::Transport { message: "refused".into() }, true)]
    #[case::gateway(status(503, None), true)]
    #[case::bad_query(status(400, Some("42703")), false)]
    fn classifies_failures(#[case] error: RestError, #[case] connection: bool) {
        let mapped = map_error(error, None);
        assert_eq!(
            matches!(mapped, ProductRepositoryError::Connection { .. }),
            connection
        );
    }

    #[rstest]
    fn empty_write_result_is_not_found() {
        let id = ProductId::random();
        let err = single(Vec::new(), &id).expect_err("no rows");
        assert_eq!(err, ProductRepositoryError::not_found(id.to_string()));
    }
}
