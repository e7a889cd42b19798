//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC method calls to the command handlers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use herd_db::DbError;
use herd_settlement::SettlementError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::events::EventFilter;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    /// Stable error name.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Server-to-client notification carrying a bus event.
#[derive(Debug, Serialize)]
struct RpcNotification {
    jsonrpc: &'static str,
    method: &'static str,
    params: serde_json::Value,
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, "METHOD_NOT_FOUND", Some(serde_json::json!({"method": method})))
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(-32602, "INVALID_PARAMS", Some(serde_json::json!({"detail": detail})))
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(-32603, "INTERNAL_ERROR", Some(serde_json::json!({"detail": detail})))
    }

    // Service errors

    /// Caller is not on the admin whitelist (-32001).
    pub fn unauthorized() -> Self {
        Self::new(-32001, "UNAUTHORIZED", None)
    }

    /// Unknown asset, config, wallet or record (-32004).
    pub fn not_found(detail: &str) -> Self {
        Self::new(-32004, "NOT_FOUND", Some(serde_json::json!({"detail": detail})))
    }

    /// The asset changed concurrently; re-read and retry (-32005).
    pub fn version_conflict(asset_id: &str) -> Self {
        Self::new(-32005, "VERSION_CONFLICT", Some(serde_json::json!({"asset_id": asset_id})))
    }

    /// Duplicate id or email (-32006).
    pub fn already_exists(detail: &str) -> Self {
        Self::new(-32006, "ALREADY_EXISTS", Some(serde_json::json!({"detail": detail})))
    }

    /// No master passphrase was supplied at start (-32010).
    pub fn secret_store_locked() -> Self {
        Self::new(-32010, "SECRET_STORE_LOCKED", None)
    }
}

impl From<SettlementError> for RpcError {
    fn from(e: SettlementError) -> Self {
        let code = match &e {
            SettlementError::Configuration { .. } => -32020,
            SettlementError::NegativeSettlement { .. } => -32021,
            SettlementError::TerminalState { .. } => -32022,
            SettlementError::InvalidTransition { .. } => -32023,
            SettlementError::NotReady { .. } => -32024,
            SettlementError::InvalidHealthScore(_) | SettlementError::InvalidWeight(_) => -32025,
            SettlementError::MissingPayee(_) => -32026,
            SettlementError::Payment(_) => -32030,
            SettlementError::ReconciliationMismatch { .. } => -32031,
            SettlementError::BookkeepingPending { .. } => -32032,
            SettlementError::PaymentLanded { .. } => -32034,
            SettlementError::Store(_) => -32033,
        };
        let mut data = serde_json::json!({"detail": e.to_string()});
        if let SettlementError::BookkeepingPending { asset_id, token, .. }
        | SettlementError::PaymentLanded { asset_id, token } = &e
        {
            data["asset_id"] = serde_json::json!(asset_id);
            data["payment_token"] = serde_json::json!(token);
        }
        Self::new(code, e.kind(), Some(data))
    }
}

impl From<DbError> for RpcError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => RpcError::not_found(&what),
            DbError::Constraint(what) => RpcError::already_exists(&what),
            DbError::Conflict { asset_id, .. } => RpcError::version_conflict(&asset_id),
            other => RpcError::internal_error(&format!("db error: {other}")),
        }
    }
}

/// Check the `caller` param against the admin whitelist.
pub fn require_admin(state: &DaemonState, params: &serde_json::Value) -> Result<String, RpcError> {
    let caller = params
        .get("caller")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("caller required"))?;
    if !state.whitelist.is_authorized(caller) {
        warn!(caller = %herd_types::Identity::new(caller).masked(), "unauthorized admin call");
        return Err(RpcError::unauthorized());
    }
    Ok(caller.trim().to_string())
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
///
/// Responses and event notifications share one outgoing queue so lines never
/// interleave.
pub async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(256);

    let writer_task = tokio::spawn(async move {
        while let Some(mut line) = out_rx.recv().await {
            line.push('\n');
            if writer.write_all(line.as_bytes()).await.is_err() || writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut subscriptions: HashMap<String, JoinHandle<()>> = HashMap::new();
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) if request.jsonrpc != "2.0" => {
                RpcResponse::error(request.id, RpcError::invalid_request())
            }
            Ok(request) if request.method == "subscribe_events" => {
                subscribe(&state, &request, &out_tx, &mut subscriptions)
            }
            Ok(request) if request.method == "unsubscribe_events" => {
                unsubscribe(&request, &mut subscriptions)
            }
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        if out_tx.send(serde_json::to_string(&response)?).await.is_err() {
            break;
        }
    }

    for (_, task) in subscriptions.drain() {
        task.abort();
    }
    drop(out_tx);
    let _ = writer_task.await;
    Ok(())
}

fn subscribe(
    state: &Arc<DaemonState>,
    request: &RpcRequest,
    out_tx: &mpsc::Sender<String>,
    subscriptions: &mut HashMap<String, JoinHandle<()>>,
) -> RpcResponse {
    let filter = match request.params.get("filter") {
        None | Some(serde_json::Value::Null) => EventFilter::default(),
        Some(value) => match serde_json::from_value::<EventFilter>(value.clone()) {
            Ok(filter) => filter,
            Err(e) => {
                return RpcResponse::error(
                    request.id.clone(),
                    RpcError::invalid_params(&format!("filter: {e}")),
                )
            }
        },
    };

    let mut sub_id = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut sub_id);
    let subscription_id = hex::encode(sub_id);

    let mut events = state.event_bus.subscribe();
    let out_tx = out_tx.clone();
    let id = subscription_id.clone();
    let task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if filter.matches(&event) => {
                    let notification = RpcNotification {
                        jsonrpc: "2.0",
                        method: "event",
                        params: serde_json::json!({"subscription_id": id, "event": event}),
                    };
                    let Ok(line) = serde_json::to_string(&notification) else {
                        continue;
                    };
                    if out_tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(subscription = %id, skipped, "subscriber lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    subscriptions.insert(subscription_id.clone(), task);

    RpcResponse::success(
        request.id.clone(),
        serde_json::json!({"subscription_id": subscription_id}),
    )
}

fn unsubscribe(request: &RpcRequest, subscriptions: &mut HashMap<String, JoinHandle<()>>) -> RpcResponse {
    let Some(subscription_id) = request.params.get("subscription_id").and_then(|v| v.as_str()) else {
        return RpcResponse::error(
            request.id.clone(),
            RpcError::invalid_params("subscription_id required"),
        );
    };
    match subscriptions.remove(subscription_id) {
        Some(task) => {
            task.abort();
            RpcResponse::success(request.id.clone(), serde_json::json!({"unsubscribed": true}))
        }
        None => RpcResponse::error(request.id.clone(), RpcError::not_found("subscription")),
    }
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Livestock registry
        "register_livestock" => commands::livestock::register_livestock(&state, params).await,
        "get_livestock" => commands::livestock::get_livestock(&state, params).await,
        "list_livestock" => commands::livestock::list_livestock(&state, params).await,
        "get_livestock_history" => commands::livestock::get_livestock_history(&state, params).await,
        "assign_owner" => commands::livestock::assign_owner(&state, params).await,
        "update_weight" => commands::livestock::update_weight(&state, params).await,
        "record_health_check" => commands::livestock::record_health_check(&state, params).await,
        "record_vaccination" => commands::livestock::record_vaccination(&state, params).await,
        "mark_ready" => commands::livestock::mark_ready(&state, params).await,
        "mark_sold" => commands::livestock::mark_sold(&state, params).await,

        // Split configuration
        "list_split_configs" => commands::splits::list_split_configs(&state, params).await,
        "save_split_config" => commands::splits::save_split_config(&state, params).await,
        "set_split_config_active" => commands::splits::set_split_config_active(&state, params).await,

        // Settlement
        "preview_settlement" => commands::settlement::preview_settlement(&state, params).await,
        "settle_livestock" => commands::settlement::settle_livestock(&state, params).await,
        "get_settlement" => commands::settlement::get_settlement(&state, params).await,
        "list_settlements" => commands::settlement::list_settlements(&state, params).await,
        "get_certificate" => commands::settlement::get_certificate(&state, params).await,

        // Custodial wallets
        "create_wallet" => commands::wallets::create_wallet(&state, params).await,
        "get_wallet" => commands::wallets::get_wallet(&state, params).await,
        "list_wallets" => commands::wallets::list_wallets(&state, params).await,
        "delete_wallet" => commands::wallets::delete_wallet(&state, params).await,

        // Diagnostics
        "get_daemon_status" => commands::diagnostics::get_daemon_status(&state).await,
        "list_admins" => commands::diagnostics::list_admins(&state, params).await,
        "shutdown" => commands::diagnostics::shutdown(&state, params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use herd_settlement::CollaboratorError;
    use herd_types::livestock::LifecycleStatus;

    use super::*;

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(RpcError::unauthorized().code, -32001);
        assert_eq!(RpcError::method_not_found("unknown").code, -32601);
        assert_eq!(RpcError::secret_store_locked().message, "SECRET_STORE_LOCKED");
    }

    #[test]
    fn test_settlement_errors_keep_kind() {
        let err: RpcError = SettlementError::TerminalState {
            status: LifecycleStatus::Settled,
            attempted: LifecycleStatus::Ready,
        }
        .into();
        assert_eq!(err.code, -32022);
        assert_eq!(err.message, "TERMINAL_STATE");

        let err: RpcError = SettlementError::BookkeepingPending {
            asset_id: "cow-1".into(),
            token: "TX1".into(),
            source: CollaboratorError::Timeout,
        }
        .into();
        assert_eq!(err.code, -32032);
        let data = err.data.expect("data");
        assert_eq!(data["payment_token"], "TX1");

        let err: RpcError = SettlementError::PaymentLanded {
            asset_id: "cow-1".into(),
            token: "TX1".into(),
        }
        .into();
        assert_eq!(err.code, -32034);
        assert_eq!(err.message, "PAYMENT_LANDED");
        assert_eq!(err.data.expect("data")["asset_id"], "cow-1");
    }

    #[test]
    fn test_db_errors() {
        assert_eq!(RpcError::from(DbError::NotFound("asset".into())).code, -32004);
        assert_eq!(
            RpcError::from(DbError::Conflict {
                asset_id: "cow-1".into(),
                expected: 2
            })
            .code,
            -32005
        );
    }

    #[test]
    fn test_rpc_response_shapes() {
        let ok = RpcResponse::success(serde_json::json!(1), serde_json::json!({"ok": true}));
        assert!(ok.result.is_some() && ok.error.is_none());

        let err = RpcResponse::error(serde_json::json!(1), RpcError::internal_error("test"));
        assert!(err.result.is_none() && err.error.is_some());
        let json = serde_json::to_value(&err).expect("serialize");
        assert!(json.get("result").is_none());
    }
}
