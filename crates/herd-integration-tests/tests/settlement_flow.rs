//! Integration test: one animal from registration to settled certificate.
//!
//! Exercises the full service through the JSON-RPC dispatcher:
//! 1. Configure a premium split and register an animal in that category
//! 2. Record weight and health, then mark it ready
//! 3. Preview the settlement without side effects
//! 4. Settle: one grouped payment, certificate issued, record written
//! 5. Verify the audit record, history and certificate
//! 6. Verify a second settlement is refused and nothing is paid twice
//!
//! Uses an in-memory database and the sandbox ledger; no socket I/O.

use std::sync::Arc;

use herd_daemon::auth::AdminWhitelist;
use herd_daemon::config::DaemonConfig;
use herd_daemon::rpc::{dispatch_request, RpcRequest, RpcResponse};
use herd_daemon::DaemonState;
use serde_json::{json, Value};

const ADMIN: &str = "ADMINWALLET000000000001";
const FARMER: &str = "FARMERWALLET00000000001";

/// 10 units gross, 2 units expenses, in micro-units.
const GROSS: u64 = 10_000_000;
const EXPENSES: u64 = 2_000_000;

fn daemon() -> Arc<DaemonState> {
    let conn = herd_db::open_memory().expect("open DB");
    let config = DaemonConfig::parse(
        r#"
        [settlement]
        platform_identity = "PLATFORMWALLET000000001"
        bookkeeping_retries = 2
        retry_backoff_ms = 1
        "#,
    )
    .expect("config");
    Arc::new(DaemonState::new(conn, config, AdminWhitelist::parse(ADMIN), None))
}

async fn call(state: &Arc<DaemonState>, method: &str, params: Value) -> RpcResponse {
    let request: RpcRequest = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    }))
    .expect("request");
    dispatch_request(state.clone(), request).await
}

async fn ok(state: &Arc<DaemonState>, method: &str, params: Value) -> Value {
    let response = call(state, method, params).await;
    assert!(response.error.is_none(), "{method} failed: {:?}", response.error);
    response.result.expect("result")
}

async fn err_code(state: &Arc<DaemonState>, method: &str, params: Value) -> i32 {
    call(state, method, params)
        .await
        .error
        .expect("call should fail")
        .code
}

async fn paid(state: &Arc<DaemonState>) -> u64 {
    state.workflow.payments().count().await.expect("payment count")
}

async fn ready_animal(state: &Arc<DaemonState>, asset_id: &str, category: &str) {
    ok(
        state,
        "register_livestock",
        json!({
            "caller": ADMIN,
            "asset_id": asset_id,
            "name": "Bella",
            "breed": "Angus",
            "category": category,
            "owner_identity": FARMER,
        }),
    )
    .await;
    ok(
        state,
        "update_weight",
        json!({"caller": ADMIN, "asset_id": asset_id, "weight_kg": 512.5, "notes": "monthly weigh-in"}),
    )
    .await;
    ok(
        state,
        "record_health_check",
        json!({"caller": ADMIN, "asset_id": asset_id, "health_score": 92, "findings": "healthy"}),
    )
    .await;
    ok(state, "mark_ready", json!({"caller": ADMIN, "asset_id": asset_id})).await;
}

fn settle_params(asset_id: &str) -> Value {
    json!({
        "caller": ADMIN,
        "asset_id": asset_id,
        "gross_amount": GROSS,
        "expenses": EXPENSES,
        "facility": "Rancho Norte Abattoir",
        "slaughtered_at": 1_700_000_000u64,
        "final_weight_kg": 498.0,
    })
}

#[tokio::test]
async fn settle_premium_animal_end_to_end() {
    let state = daemon();

    // =========================================================
    // Setup: premium split 80/20, animal ready for slaughter
    // =========================================================
    ok(
        &state,
        "save_split_config",
        json!({"caller": ADMIN, "id": "premium-80", "category": "premium", "farmer_share": 80, "platform_share": 20}),
    )
    .await;
    ready_animal(&state, "cow-001", "premium").await;

    // =========================================================
    // Preview: 8 units net split 80/20, nothing changes
    // =========================================================
    let preview = ok(
        &state,
        "preview_settlement",
        json!({"asset_id": "cow-001", "gross_amount": GROSS, "expenses": EXPENSES}),
    )
    .await;
    assert_eq!(preview["split"]["id"], "premium-80");
    assert_eq!(preview["result"]["net_amount"], 8_000_000);
    assert_eq!(preview["result"]["farmer_amount"], 6_400_000);
    assert_eq!(preview["result"]["platform_amount"], 1_600_000);
    assert_eq!(preview["remainder"], 0);
    assert_eq!(paid(&state).await, 0, "preview must not pay");

    // =========================================================
    // Settle
    // =========================================================
    let record = ok(&state, "settle_livestock", settle_params("cow-001")).await;
    assert_eq!(record["split_id"], "premium-80");
    assert_eq!(record["farmer"], FARMER);
    assert_eq!(record["platform"], "PLATFORMWALLET000000001");
    assert_eq!(record["result"]["farmer_amount"], 6_400_000);
    assert_eq!(paid(&state).await, 1);

    let asset = ok(&state, "get_livestock", json!({"asset_id": "cow-001"})).await;
    assert_eq!(asset["lifecycle_status"], "settled");
    assert_eq!(asset["current_weight_kg"], 498.0);

    // =========================================================
    // Audit: record, history and certificate agree
    // =========================================================
    let stored = ok(&state, "get_settlement", json!({"asset_id": "cow-001"})).await;
    assert_eq!(stored, record);

    let history = ok(&state, "get_livestock_history", json!({"asset_id": "cow-001"})).await;
    let kinds: Vec<&str> = history
        .as_array()
        .expect("history array")
        .iter()
        .filter_map(|e| e["kind"].as_str())
        .collect();
    assert_eq!(
        kinds,
        vec!["birth", "weight_update", "health_check", "status_change", "slaughter"]
    );

    let content_ref = record["certificate"].as_str().expect("certificate ref");
    let certificate = ok(&state, "get_certificate", json!({"content_ref": content_ref})).await;
    assert_eq!(certificate["asset_id"], "cow-001");
    assert_eq!(certificate["payment_token"], record["payment_token"]);
    assert_eq!(certificate["slaughter"]["facility"], "Rancho Norte Abattoir");

    // =========================================================
    // Settled is terminal: no second payment, no mutation
    // =========================================================
    assert_eq!(err_code(&state, "settle_livestock", settle_params("cow-001")).await, -32022);
    assert_eq!(
        err_code(&state, "update_weight", json!({"caller": ADMIN, "asset_id": "cow-001", "weight_kg": 10.0})).await,
        -32022
    );
    assert_eq!(paid(&state).await, 1);

    let listed = ok(&state, "list_settlements", json!({})).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn unknown_category_uses_builtin_default() {
    let state = daemon();
    ready_animal(&state, "cow-002", "wagyu").await;

    let record = ok(&state, "settle_livestock", settle_params("cow-002")).await;
    assert_eq!(record["split_id"], "default");
    assert_eq!(record["farmer_share"], 70);
    assert_eq!(record["result"]["farmer_amount"], 5_600_000);
    assert_eq!(record["result"]["platform_amount"], 2_400_000);
}

#[tokio::test]
async fn negative_net_is_rejected_without_payment() {
    let state = daemon();
    ready_animal(&state, "cow-003", "standard").await;

    let mut params = settle_params("cow-003");
    params["expenses"] = json!(GROSS + 1);
    assert_eq!(err_code(&state, "settle_livestock", params).await, -32021);
    assert_eq!(paid(&state).await, 0);

    let asset = ok(&state, "get_livestock", json!({"asset_id": "cow-003"})).await;
    assert_eq!(asset["lifecycle_status"], "ready");
    assert_eq!(err_code(&state, "get_settlement", json!({"asset_id": "cow-003"})).await, -32004);
}

#[tokio::test]
async fn settlement_requires_admin_and_payee() {
    let state = daemon();

    let mut params = settle_params("cow-004");
    params["caller"] = json!("MALLORY");
    assert_eq!(err_code(&state, "settle_livestock", params).await, -32001);

    // Registered without an owner and settled without a farmer identity.
    ok(
        &state,
        "register_livestock",
        json!({"caller": ADMIN, "asset_id": "cow-004", "name": "Daisy", "breed": "Hereford"}),
    )
    .await;
    assert_eq!(err_code(&state, "settle_livestock", settle_params("cow-004")).await, -32026);

    // An explicit farmer identity is enough, even from `active`.
    let mut params = settle_params("cow-004");
    params["farmer_identity"] = json!(FARMER);
    let record = ok(&state, "settle_livestock", params).await;
    assert_eq!(record["farmer"], FARMER);
}

#[tokio::test]
async fn settlement_events_reach_subscribers() {
    let state = daemon();
    let mut events = state.event_bus.subscribe();
    ready_animal(&state, "cow-005", "standard").await;
    ok(&state, "settle_livestock", settle_params("cow-005")).await;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.event_type);
    }
    assert_eq!(seen.first().map(String::as_str), Some("livestock_registered"));
    assert_eq!(seen.last().map(String::as_str), Some("settlement_committed"));
}
