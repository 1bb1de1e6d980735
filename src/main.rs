// src/main.rs

//! # Soulbound Credentials - Main Entry Point
//!
//! Wires the issuer registry, credential ledger, content store and
//! verification engine together and starts the API server.
//!
//! ## Environment Variables
//! - `SBT_PRIVATE_KEY` (or `PRIVATE_KEY`): server wallet key; random if unset
//! - `SBT_ADMIN_ADDRESS`: platform administrator (default: server wallet)
//! - `SBT_IPFS_API_URL`: IPFS node for metadata (default: in-memory store)
//! - `SBT_BIND_ADDRESS`: listen address (default: 127.0.0.1:3000)
//! - `SBT_FETCH_TIMEOUT_MS`: metadata fetch timeout during verification

use anyhow::Context;
use dotenv::dotenv;
use soulbound_credentials::blockchain::clock::{Clock, SystemClock};
use soulbound_credentials::config::Settings;
use soulbound_credentials::contracts::Deployment;
use soulbound_credentials::services::api_server::ApiServer;
use soulbound_credentials::services::credential_issuer::CredentialIssuer;
use soulbound_credentials::services::verifier::Verifier;
use soulbound_credentials::storage::content_store::{ContentStore, MemoryContentStore};
use soulbound_credentials::storage::ipfs_client::IpfsStorage;
use soulbound_credentials::utils::crypto::format_address;
use soulbound_credentials::wallet::key_management::{KeyManager, Signer};
use std::sync::Arc;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load `.env` and settings, initialize logging
/// 2. Load or generate the server wallet
/// 3. Deploy registry and ledger
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let settings = Settings::load().context("failed to load settings")?;

    let key_manager = match settings
        .private_key
        .clone()
        .or_else(|| std::env::var("PRIVATE_KEY").ok())
    {
        Some(key) => KeyManager::from_private_key(&key).context("invalid private key")?,
        None => {
            log::warn!("no private key configured, using an ephemeral wallet");
            KeyManager::new()
        }
    };
    let wallet = key_manager.address();
    let admin = settings.admin(wallet)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let deployment = Deployment::new(admin, clock.clone());

    let store: Arc<dyn ContentStore> = match settings.ipfs_api_url.as_deref() {
        Some(url) => {
            log::info!("pinning presentation metadata to IPFS at {}", url);
            Arc::new(IpfsStorage::new(url)?.with_read_timeout(settings.fetch_timeout()))
        }
        None => {
            log::info!("keeping presentation metadata in memory");
            Arc::new(MemoryContentStore::new())
        }
    };

    let credential_issuer = CredentialIssuer::new(
        deployment.ledger.clone(),
        store.clone(),
        Arc::new(key_manager),
        clock.clone(),
    );
    let verifier =
        Verifier::new(deployment.ledger.clone(), store, clock).with_fetch_timeout(settings.fetch_timeout());

    log::info!(
        "server wallet {}, administrator {}",
        format_address(&wallet),
        format_address(&admin)
    );

    let addr = settings.socket_addr()?;
    ApiServer::new(deployment, credential_issuer, verifier)
        .run(addr)
        .await
        .context("API server failed")?;
    Ok(())
}
