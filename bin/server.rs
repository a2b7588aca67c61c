// Umbra Payments - Web Server
// REST API with Axum over the in-memory ledger + gacha core

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use umbra_payments::{
    DrawOutcome, DrawnItem, GachaEngine, Ledger, Money, PaymentError, Pool, Transaction, Wallet,
    VERSION,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    ledger: Arc<Ledger>,
    gacha: Arc<GachaEngine>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Map a core error to its HTTP status and wrap it in the envelope.
fn error_response(error: &PaymentError) -> Response {
    let status = match error {
        PaymentError::PoolNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ApiResponse {
            success: false,
            data: Value::Null,
            error: Some(error.to_string()),
        }),
    )
        .into_response()
}

fn bad_request(detail: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse {
            success: false,
            data: Value::Null,
            error: Some(detail.to_string()),
        }),
    )
        .into_response()
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Deserialize)]
struct TopUpRequest {
    amount: Option<Value>,
    source: Option<String>,
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct SpendRequest {
    amount: Option<Value>,
    reason: Option<String>,
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct DrawRequest {
    user_id: Option<String>,
    #[serde(default = "default_pool")]
    pool: String,
    draws: Option<Value>,
    seed: Option<u64>,
}

fn default_pool() -> String {
    "standard".to_string()
}

#[derive(Serialize)]
struct WalletResponse {
    wallet: Wallet,
    transactions: Vec<Transaction>,
}

#[derive(Serialize)]
struct MutationResponse {
    wallet: Wallet,
    transaction: Transaction,
}

#[derive(Serialize)]
struct TransactionsResponse {
    transactions: Vec<Transaction>,
}

#[derive(Serialize)]
struct PoolsResponse {
    pools: Vec<Pool>,
}

/// The raw amount field of a topup/spend body, converted at the boundary.
fn parse_amount(raw: Option<&Value>) -> Result<Money, PaymentError> {
    match raw {
        Some(value) => Money::from_json(value),
        None => Err(PaymentError::InvalidAmount(
            "amount is required".to_string(),
        )),
    }
}

/// The raw draws field; defaults to 1, rejects non-integers before the core
/// is reached.
fn parse_draw_count(raw: Option<&Value>) -> Result<i64, PaymentError> {
    match raw {
        None => Ok(1),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| PaymentError::InvalidDrawCount(value.to_string())),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(serde_json::json!({
        "status": "healthy",
        "service": "umbra-payments",
        "version": VERSION,
    })))
}

/// GET /wallets/:user_id - Wallet plus its history
async fn get_wallet_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let wallet = state.ledger.get_wallet(&user_id);
    let transactions = state.ledger.list_transactions(&user_id);
    Json(ApiResponse::ok(WalletResponse {
        wallet,
        transactions,
    }))
}

/// POST /wallets/:user_id/topup - Credit a wallet
async fn wallet_topup(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<TopUpRequest>,
) -> Response {
    let amount = match parse_amount(body.amount.as_ref()) {
        Ok(amount) => amount,
        Err(error) => return error_response(&error),
    };

    let transaction = state
        .ledger
        .credit(&user_id, amount, body.source.as_deref(), body.metadata);
    let wallet = state.ledger.get_wallet(&user_id);
    Json(ApiResponse::ok(MutationResponse {
        wallet,
        transaction,
    }))
    .into_response()
}

/// POST /wallets/:user_id/spend - Debit a wallet
async fn wallet_spend(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<SpendRequest>,
) -> Response {
    let amount = match parse_amount(body.amount.as_ref()) {
        Ok(amount) => amount,
        Err(error) => return error_response(&error),
    };

    match state
        .ledger
        .debit(&user_id, amount, body.reason.as_deref(), body.metadata)
    {
        Ok(transaction) => {
            let wallet = state.ledger.get_wallet(&user_id);
            Json(ApiResponse::ok(MutationResponse {
                wallet,
                transaction,
            }))
            .into_response()
        }
        Err(error) => error_response(&error),
    }
}

/// GET /wallets/:user_id/transactions - Ordered history
async fn wallet_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let transactions = state.ledger.list_transactions(&user_id);
    Json(ApiResponse::ok(TransactionsResponse { transactions }))
}

/// GET /gacha/pools - Configured pools with cost and weighted items
async fn list_pools(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(PoolsResponse {
        pools: state.gacha.list_pools().to_vec(),
    }))
}

/// POST /gacha/draw - Pay for and perform weighted draws
async fn gacha_draw(State(state): State<AppState>, Json(body): Json<DrawRequest>) -> Response {
    let user_id = match body.user_id {
        Some(user_id) => user_id,
        None => return bad_request("user_id is required"),
    };
    let draws = match parse_draw_count(body.draws.as_ref()) {
        Ok(draws) => draws,
        Err(error) => return error_response(&error),
    };

    match state
        .gacha
        .draw(&state.ledger, &user_id, &body.pool, draws, body.seed)
    {
        Ok(outcome) => Json(ApiResponse::ok(DrawResponse::from(outcome))).into_response(),
        Err(error) => error_response(&error),
    }
}

/// Draw result as exposed on the wire (original field names)
#[derive(Serialize)]
struct DrawResponse {
    pool: String,
    draws: i64,
    items: Vec<DrawnItem>,
    remaining_balance: Money,
}

impl From<DrawOutcome> for DrawResponse {
    fn from(outcome: DrawOutcome) -> Self {
        Self {
            pool: outcome.pool_name,
            draws: outcome.draw_count,
            items: outcome.items,
            remaining_balance: outcome.remaining_balance,
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Umbra Payments - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Process-wide RNG seed from the environment; unset → entropy
    let seed = env::var("GACHA_RANDOM_SEED")
        .ok()
        .map(|raw| {
            raw.parse::<u64>()
                .expect("GACHA_RANDOM_SEED must be an integer")
        });
    match seed {
        Some(seed) => println!("✓ Gacha RNG seeded with {}", seed),
        None => println!("✓ Gacha RNG self-seeded from entropy"),
    }

    let state = AppState {
        ledger: Arc::new(Ledger::new()),
        gacha: Arc::new(GachaEngine::new(seed)),
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/wallets/:user_id", get(get_wallet_endpoint))
        .route("/wallets/:user_id/topup", post(wallet_topup))
        .route("/wallets/:user_id/spend", post(wallet_spend))
        .route("/wallets/:user_id/transactions", get(wallet_transactions))
        .route("/gacha/pools", get(list_pools))
        .route("/gacha/draw", post(gacha_draw))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let port = env::var("PORT").unwrap_or_else(|_| "5003".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:{}", port);
    println!("   Wallets: POST /wallets/:user_id/topup");
    println!("   Gacha:   POST /gacha/draw");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
