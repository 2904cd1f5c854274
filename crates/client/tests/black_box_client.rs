use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

use stockflow_client::{
    ApiClient, ApiError, AppState, Banner, ClientConfig, ClientError, IdentityError, IdentityProvider,
    MIN_TOKEN_VALIDITY, RefreshOutcome, RefreshTokenProvider, TokenRefresher, create_product,
    delete_product, load_history, submit_movement,
};
use stockflow_auth::AuthzError;
use stockflow_core::ProductId;
use stockflow_inventory::{MovementError, MovementType, RawAmount};
use stockflow_products::ProductDraft;

#[derive(Default)]
struct Backend {
    products: Vec<Value>,
    movements: Vec<Value>,
    movement_posts: usize,
    product_posts: usize,
    last_limit: Option<String>,
    history_forbidden: bool,
    bearer_seen: Vec<Option<String>>,
    issued_tokens: Vec<String>,
    token_grants: Vec<HashMap<String, String>>,
}

type Shared = Arc<Mutex<Backend>>;

struct TestServer {
    base_url: String,
    backend: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let backend: Shared = Arc::new(Mutex::new(Backend {
            products: vec![
                json!({"id": 1, "name": "Widget", "category": "Parts", "price": 2.5, "currentQuantity": 10}),
                json!({"id": 2, "name": "Gadget", "category": "Tools", "price": 9.0, "currentQuantity": 3, "minimumStock": 2}),
            ],
            ..Backend::default()
        }));

        let app = Router::new()
            .route("/api/public/products", get(public_products))
            .route("/api/v2/products", get(products).post(new_product))
            .route("/api/v2/products/:id", get(product).delete(remove_product))
            .route("/api/v2/stock/movement", post(movement))
            .route("/api/v2/stock/recent", get(recent))
            .route("/token", post(token))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            backend,
            handle,
        }
    }

    fn client(&self, token: Option<String>) -> ApiClient {
        let config = ClientConfig {
            api_url: self.base_url.clone(),
            token,
            ..ClientConfig::default()
        };
        ApiClient::from_config(config).unwrap()
    }

    fn refreshing_config(&self, token: Option<String>) -> ClientConfig {
        ClientConfig {
            api_url: self.base_url.clone(),
            token,
            token_url: Some(format!("{}/token", self.base_url)),
            refresh_token: Some("r-1".to_string()),
            ..ClientConfig::default()
        }
    }

    fn backend(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(username: &str, realm_roles: &[&str], client_roles: &[&str]) -> String {
    mint_jwt_valid_for(username, realm_roles, client_roles, ChronoDuration::minutes(10))
}

fn mint_jwt_valid_for(username: &str, realm_roles: &[&str], client_roles: &[&str], ttl: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = json!({
        "sub": format!("sub-{username}"),
        "preferred_username": username,
        "iat": now.timestamp(),
        "exp": (now + ttl).timestamp(),
        "realm_access": { "roles": realm_roles },
        "resource_access": { "inventory-app-public": { "roles": client_roles } },
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"identity-provider"),
    )
    .expect("failed to encode jwt")
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": "request_failed", "message": message }))).into_response()
}

async fn public_products(State(backend): State<Shared>, headers: HeaderMap) -> Json<Value> {
    let mut b = backend.lock().unwrap();
    b.bearer_seen.push(bearer(&headers));
    Json(Value::Array(b.products.clone()))
}

async fn products(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let mut b = backend.lock().unwrap();
    let token = bearer(&headers);
    b.bearer_seen.push(token.clone());
    if token.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(Value::Array(b.products.clone())).into_response()
}

async fn product(State(backend): State<Shared>, Path(id): Path<i64>) -> Response {
    let b = backend.lock().unwrap();
    match b.products.iter().find(|p| p["id"] == id) {
        Some(p) => Json(p.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn new_product(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut b = backend.lock().unwrap();
    b.product_posts += 1;
    let id = b.products.len() as i64 + 1;
    let created = json!({
        "id": id,
        "name": body["name"],
        "category": body["category"],
        "price": body["price"],
        "currentQuantity": body["initialQuantity"],
        "minimumStock": body["minimumStock"],
    });
    b.products.push(created.clone());
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn remove_product(State(backend): State<Shared>, Path(id): Path<i64>) -> StatusCode {
    let mut b = backend.lock().unwrap();
    b.products.retain(|p| p["id"] != id);
    StatusCode::NO_CONTENT
}

async fn movement(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut b = backend.lock().unwrap();
    b.movement_posts += 1;

    if body["reason"] == "server says no" {
        return error(StatusCode::BAD_REQUEST, "Movement rejected by policy");
    }

    let product_id = body["productId"].as_i64().unwrap_or_default();
    let Some(product) = b.products.iter_mut().find(|p| p["id"] == product_id) else {
        return error(StatusCode::NOT_FOUND, "Product not found");
    };

    let previous = product["currentQuantity"].as_u64().unwrap_or_default();
    let quantity = body["quantity"].as_u64().unwrap_or_default();
    let new = match body["movementType"].as_str().unwrap_or_default() {
        "STOCK_IN" | "RETURN" => previous + quantity,
        "STOCK_OUT" | "LOSS" => previous.saturating_sub(quantity),
        _ => quantity,
    };
    product["currentQuantity"] = json!(new);
    let name = product["name"].clone();

    let recorded = json!({
        "id": b.movements.len() + 1,
        "productId": product_id,
        "productName": name,
        "movementType": body["movementType"],
        "quantity": quantity,
        "reason": body["reason"],
        "previousQuantity": previous,
        "newQuantity": new,
        "createdBy": "employee",
        "createdAt": Utc::now().to_rfc3339(),
    });
    b.movements.push(recorded.clone());
    (StatusCode::CREATED, Json(recorded)).into_response()
}

async fn recent(State(backend): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Response {
    let mut b = backend.lock().unwrap();
    b.last_limit = params.get("limit").cloned();
    if b.history_forbidden {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(Value::Array(b.movements.clone())).into_response()
}

async fn token(State(backend): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    let mut b = backend.lock().unwrap();
    b.token_grants.push(form);
    if b.issued_tokens.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Token is not active" })),
        )
            .into_response();
    }
    let access_token = b.issued_tokens.remove(0);
    let rotated = format!("r-{}", b.token_grants.len() + 1);
    Json(json!({ "access_token": access_token, "refresh_token": rotated, "token_type": "Bearer" })).into_response()
}

#[tokio::test]
async fn anonymous_viewers_browse_the_public_catalog() {
    let srv = TestServer::spawn().await;
    let api = srv.client(None);

    let products = api.browse_products().await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Widget");
    assert_eq!(srv.backend().bearer_seen, vec![None]);

    let err = api.list_products().await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized("API Error: Unauthorized".to_string()));
}

#[tokio::test]
async fn employee_records_movement_with_authoritative_quantity() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt("employee", &["offline_access"], &["employee"]);
    let api = srv.client(Some(token.clone()));

    let product = api.get_product(ProductId::new(1)).await.unwrap();
    let recorded = submit_movement(&api, &product, MovementType::StockOut, RawAmount::Text("4"), "  order #12  ")
        .await
        .unwrap();

    assert_eq!(recorded.previous_quantity, Some(10));
    assert_eq!(recorded.new_quantity, Some(6));
    assert_eq!(recorded.reason, "order #12");
    assert_eq!(recorded.delta().to_string(), "-4");

    let backend = srv.backend();
    assert_eq!(backend.movement_posts, 1);
    assert_eq!(backend.products[0]["currentQuantity"], 6);
}

#[tokio::test]
async fn client_side_failures_never_reach_the_backend() {
    let srv = TestServer::spawn().await;
    let api = srv.client(Some(mint_jwt("employee", &["employee"], &[])));
    let product = api.get_product(ProductId::new(2)).await.unwrap();

    let err = submit_movement(&api, &product, MovementType::StockOut, RawAmount::Text("5"), "order")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot remove 5 items. Current stock is 3"
    );
    assert!(err.is_client_side());

    let err = submit_movement(&api, &product, MovementType::StockIn, RawAmount::Text("0"), "restock")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Movement(MovementError::InvalidQuantity { .. })));

    let err = submit_movement(&api, &product, MovementType::Loss, RawAmount::Number(1), "   ")
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::Movement(MovementError::MissingReason));

    assert_eq!(srv.backend().movement_posts, 0);
}

#[tokio::test]
async fn guests_and_anonymous_viewers_cannot_move_stock() {
    let srv = TestServer::spawn().await;
    let product = srv.client(None).get_product(ProductId::new(1)).await;
    // Product lookups hit the authenticated prefix; the mock does not check it.
    let product = product.unwrap();

    let guest = srv.client(Some(mint_jwt("visitor", &["offline_access"], &[])));
    let err = submit_movement(&guest, &product, MovementType::StockIn, RawAmount::Number(1), "x")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Authz(AuthzError::Forbidden(_, _))));

    let anonymous = srv.client(None);
    let err = submit_movement(&anonymous, &product, MovementType::StockIn, RawAmount::Number(1), "x")
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::Authz(AuthzError::Unauthenticated));

    assert_eq!(srv.backend().movement_posts, 0);
}

#[tokio::test]
async fn server_messages_are_surfaced_verbatim() {
    let srv = TestServer::spawn().await;
    let api = srv.client(Some(mint_jwt("admin", &["admin"], &[])));
    let product = api.get_product(ProductId::new(1)).await.unwrap();

    let err = submit_movement(&api, &product, MovementType::StockIn, RawAmount::Number(2), "server says no")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Api(ApiError::ServerValidation {
            status: 400,
            message: "Movement rejected by policy".to_string()
        })
    );
    assert_eq!(err.to_string(), "Movement rejected by policy");
    assert_eq!(srv.backend().movement_posts, 1);

    let err = api.get_product(ProductId::new(99)).await.unwrap_err();
    assert_eq!(err, ApiError::NotFound("Product not found".to_string()));
}

#[tokio::test]
async fn adjustment_to_zero_is_accepted() {
    let srv = TestServer::spawn().await;
    let api = srv.client(Some(mint_jwt("employee", &["employee"], &[])));
    let product = api.get_product(ProductId::new(1)).await.unwrap();

    let recorded = submit_movement(&api, &product, MovementType::Adjustment, RawAmount::Text("0"), "cycle count")
        .await
        .unwrap();
    assert_eq!(recorded.new_quantity, Some(0));
}

#[tokio::test]
async fn history_uses_default_limit_and_reports_forbidden() {
    let srv = TestServer::spawn().await;
    let api = srv.client(Some(mint_jwt("employee", &["employee"], &[])));
    let product = api.get_product(ProductId::new(1)).await.unwrap();
    submit_movement(&api, &product, MovementType::StockIn, RawAmount::Number(3), "restock")
        .await
        .unwrap();

    let movements = load_history(&api, None, None).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert!(movements[0].is_consistent());
    assert_eq!(srv.backend().last_limit.as_deref(), Some("500"));

    srv.backend().history_forbidden = true;
    let mut state = AppState::new(api.viewer().await);
    let ticket = state.begin_movements_fetch();
    let result = api.recent_movements(Some(20)).await;
    assert_eq!(srv.backend().last_limit.as_deref(), Some("20"));

    assert!(state.apply_movements(ticket, result));
    assert_eq!(
        state.banner,
        Some(Banner::error(
            "You do not have permission to view stock history. Please contact an administrator."
        ))
    );
}

#[tokio::test]
async fn product_management_requires_valid_drafts() {
    let srv = TestServer::spawn().await;
    let api = srv.client(Some(mint_jwt("admin", &["ROLE_ADMIN"], &[])));

    let err = create_product(&api, &ProductDraft::new("   ", 1.0)).await.unwrap_err();
    assert!(matches!(err, ClientError::Invalid(_)));
    assert_eq!(srv.backend().product_posts, 0);

    let mut draft = ProductDraft::new("Sprocket", 4.25);
    draft.category = "Parts".to_string();
    draft.initial_quantity = 7;
    let created = create_product(&api, &draft).await.unwrap();
    assert_eq!(created.id, ProductId::new(3));
    assert_eq!(created.current_quantity, 7);

    delete_product(&api, created.id).await.unwrap();
    assert_eq!(srv.backend().products.len(), 2);
}

#[tokio::test]
async fn expired_configured_token_is_ignored() {
    let srv = TestServer::spawn().await;
    let stale = mint_jwt_valid_for("employee", &["employee"], &[], ChronoDuration::minutes(-1));
    let api = srv.client(Some(stale));

    assert!(!api.viewer().await.is_authenticated());
    api.browse_products().await.unwrap();
    assert_eq!(srv.backend().bearer_seen, vec![None]);
}

#[tokio::test]
async fn refresh_grant_renews_session_and_rotates_refresh_token() {
    let srv = TestServer::spawn().await;
    srv.backend().issued_tokens = vec![
        mint_jwt_valid_for("employee", &["employee"], &[], ChronoDuration::seconds(10)),
        mint_jwt("employee", &["admin"], &[]),
    ];
    let api = ApiClient::from_config(srv.refreshing_config(None)).unwrap();
    let provider = RefreshTokenProvider::from_config(api.config(), api.session().clone())
        .unwrap()
        .expect("refresh is configured");
    let refresher = TokenRefresher::new(
        Arc::new(provider),
        api.session().clone(),
        api.config().client_id.clone(),
        api.config().refresh_interval,
    );

    refresher.refresh_once().await.unwrap();
    assert_eq!(api.viewer().await.role_label(), "Employee");

    // Ten seconds left is inside the minimum validity, so the next call exchanges again.
    refresher.refresh_once().await.unwrap();
    assert_eq!(api.viewer().await.role_label(), "Admin");

    refresher.refresh_once().await.unwrap();

    let grants = srv.backend().token_grants.clone();
    assert_eq!(grants.len(), 2);
    assert_eq!(grants[0]["grant_type"], "refresh_token");
    assert_eq!(grants[0]["client_id"], "inventory-app-public");
    assert_eq!(grants[0]["refresh_token"], "r-1");
    assert_eq!(grants[1]["refresh_token"], "r-2");

    api.list_products().await.unwrap();
    assert!(srv.backend().bearer_seen.last().unwrap().is_some());
}

#[tokio::test]
async fn rejected_refresh_grant_ends_the_session() {
    let srv = TestServer::spawn().await;
    let config = srv.refreshing_config(Some(mint_jwt_valid_for(
        "employee",
        &["employee"],
        &[],
        ChronoDuration::seconds(5),
    )));
    let api = ApiClient::from_config(config).unwrap();
    assert!(api.viewer().await.is_authenticated());

    let provider = Arc::new(
        RefreshTokenProvider::from_config(api.config(), api.session().clone())
            .unwrap()
            .expect("refresh is configured"),
    );
    assert_eq!(
        provider.refresh(MIN_TOKEN_VALIDITY).await,
        Err(IdentityError::Refresh("Token is not active".to_string()))
    );
    assert!(matches!(provider.login().await, Err(IdentityError::Login(_))));

    let handle = TokenRefresher::new(
        provider,
        api.session().clone(),
        api.config().client_id.clone(),
        std::time::Duration::from_millis(20),
    )
    .start();
    assert_eq!(handle.join().await, RefreshOutcome::ReauthenticationRequired);
    assert!(!api.viewer().await.is_authenticated());
}

#[tokio::test]
async fn refresh_is_not_configured_without_endpoint() {
    let srv = TestServer::spawn().await;
    let api = srv.client(None);
    let provider = RefreshTokenProvider::from_config(api.config(), api.session().clone()).unwrap();
    assert!(provider.is_none());
}
