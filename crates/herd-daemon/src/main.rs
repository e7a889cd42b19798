//! herd-daemon binary entry point.

use std::sync::Arc;

use herd_crypto::argon2id::KdfParams;
use herd_daemon::auth::AdminWhitelist;
use herd_daemon::config::DaemonConfig;
use herd_daemon::events::{Event, DAEMON_STARTED};
use herd_daemon::rpc::RpcServer;
use herd_daemon::secrets::{PassphraseSecretStore, SecretStore, PASSPHRASE_ENV};
use herd_daemon::DaemonState;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(config.log_directive().parse()?),
        )
        .init();

    info!("Herd daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let conn = herd_db::open(&data_dir.join("herd.db"))?;

    // 3. Admin whitelist
    let whitelist = AdminWhitelist::from_config_and_env(&config.auth.authorized_identities);
    if whitelist.is_empty() {
        warn!("Admin whitelist is empty; every admin operation will be refused");
    } else {
        info!(admins = whitelist.len(), "Admin whitelist loaded");
    }

    // 4. Master key, if a passphrase was supplied
    let secrets: Option<Box<dyn SecretStore>> = match std::env::var(PASSPHRASE_ENV) {
        Ok(passphrase) => {
            let passphrase = Zeroizing::new(passphrase);
            let store = PassphraseSecretStore::unlock(&conn, passphrase.as_bytes(), KdfParams::default())?;
            info!("Secret store unlocked");
            Some(Box::new(store))
        }
        Err(_) => {
            warn!("{PASSPHRASE_ENV} not set; custodial wallet commands disabled");
            None
        }
    };

    // 5. Build daemon state
    let state = Arc::new(DaemonState::new(conn, config, whitelist, secrets));

    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    state.event_bus.emit(Event::new(
        DAEMON_STARTED,
        herd_daemon::now(),
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "platform_identity": state.config.settlement.platform_identity,
        }),
    ));

    // 6. Run the RPC server until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    info!("Daemon stopped");
    Ok(())
}
