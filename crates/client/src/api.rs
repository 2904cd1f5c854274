//! REST client for the inventory backend.

use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use stockflow_auth::Viewer;
use stockflow_core::ProductId;
use stockflow_inventory::{NewStockMovement, StockMovement};
use stockflow_products::{Product, ProductDraft};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::{Session, SharedSession};

/// Default `limit` of the recent-movements query.
pub const RECENT_MOVEMENTS_LIMIT: u32 = 500;

/// Thin wrapper over `reqwest` that attaches the session's bearer token and
/// maps failures to [`ApiError`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: SharedSession,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: SharedSession) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            session,
        })
    }

    /// Client with a session built from `config.token` (anonymous when unset,
    /// undecodable or expired).
    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        let session = match config.token.as_deref() {
            Some(token) => Session::restore(token, &config.client_id, Utc::now()).unwrap_or_else(|e| {
                tracing::warn!("ignoring configured token: {}", e);
                Session::anonymous()
            }),
            None => Session::anonymous(),
        };
        Self::new(config, session.shared())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub async fn viewer(&self) -> Viewer {
        self.session.read().await.viewer().clone()
    }

    /// `GET /products`
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.send_json(self.request(Method::GET, "/products").await).await
    }

    /// `GET {public}/products`, no token attached.
    pub async fn list_public_products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.config.public_endpoint("/products");
        self.send_json(self.http.get(url)).await
    }

    /// Authenticated listing when logged in, public listing otherwise.
    pub async fn browse_products(&self) -> Result<Vec<Product>, ApiError> {
        if self.viewer().await.is_authenticated() {
            self.list_products().await
        } else {
            self.list_public_products().await
        }
    }

    /// `GET /products/{id}`
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let path = format!("/products/{id}");
        self.send_json(self.request(Method::GET, &path).await).await
    }

    /// `POST /products`
    pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product, ApiError> {
        let req = self.request(Method::POST, "/products").await.json(draft);
        self.send_json(req).await
    }

    /// `PUT /products/{id}`
    pub async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<Product, ApiError> {
        let path = format!("/products/{id}");
        let req = self.request(Method::PUT, &path).await.json(draft);
        self.send_json(req).await
    }

    /// `DELETE /products/{id}`
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        let path = format!("/products/{id}");
        self.send(self.request(Method::DELETE, &path).await).await?;
        Ok(())
    }

    /// `POST /stock/movement`. The returned movement carries the
    /// authoritative new quantity.
    pub async fn record_movement(&self, body: &NewStockMovement) -> Result<StockMovement, ApiError> {
        let req = self.request(Method::POST, "/stock/movement").await.json(body);
        self.send_json(req).await
    }

    /// `GET /stock/recent?limit={limit}`
    pub async fn recent_movements(&self, limit: Option<u32>) -> Result<Vec<StockMovement>, ApiError> {
        let limit = limit.unwrap_or(RECENT_MOVEMENTS_LIMIT);
        let req = self
            .request(Method::GET, "/stock/recent")
            .await
            .query(&[("limit", limit)]);
        self.send_json(req).await
    }

    /// `GET /stock/product/{id}`
    pub async fn product_movements(&self, id: ProductId) -> Result<Vec<StockMovement>, ApiError> {
        let path = format!("/stock/product/{id}");
        self.send_json(self.request(Method::GET, &path).await).await
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, self.config.api_endpoint(path));
        match self.session.read().await.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let url = resp.url().path().to_string();
        let body = resp.text().await.unwrap_or_default();
        let err = ApiError::from_response(status, &body);
        tracing::warn!(status = status.as_u16(), path = %url, "request failed: {}", err);
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = self.send(req).await?;
        resp.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}
