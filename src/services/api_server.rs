// src/services/api_server.rs
//! API Server for the soulbound credential system
//!
//! REST interface over the issuer registry, the credential ledger and the
//! verification engine. The server's wallet is the calling identity for
//! every state-changing request: it must hold the Administrator role for
//! issuer management and be a registered, active issuer to mint.
//!
//! The API is built using Axum and includes endpoints for:
//! - Issuer registration, profile updates, activation and lookup
//! - Credential issuance, revocation, lookup and status checks
//! - Presentation bundles and their online/offline verification
//! - The audit event log

use crate::contracts::credential_registry::IssueRequest;
use crate::contracts::Deployment;
use crate::errors::{IssuanceError, LedgerError, PresentationError, StorageError};
use crate::models::credential::{Credential, CredentialVerification};
use crate::models::issuer::{Issuer, IssuerProfile};
use crate::services::credential_issuer::{CredentialIssuer, IssuedPresentation, PresentationOptions};
use crate::services::verifier::{VerificationResult, Verifier};
use crate::utils::crypto::format_address;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

// API request and response structures

/// Request payload for registering an issuer
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterIssuerRequest {
    identity: Address,
    name: String,
    #[serde(flatten)]
    profile: IssuerProfile,
}

/// Request payload for issuing a credential
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueCredentialRequest {
    #[serde(flatten)]
    credential: IssueRequest,
    #[serde(default)]
    presentation: PresentationOptions,
}

/// Response for issuance and presentation requests
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresentationResponse {
    credential_id: u64,
    content_ref: String,
    /// Compact payload to encode into a QR code
    payload: String,
    /// Extended metadata exactly as pinned
    metadata: String,
}

impl From<IssuedPresentation> for PresentationResponse {
    fn from(presentation: IssuedPresentation) -> Self {
        PresentationResponse {
            credential_id: presentation.compact.credential_id,
            content_ref: presentation.compact.content_ref,
            payload: String::from_utf8_lossy(&presentation.payload).into_owned(),
            metadata: String::from_utf8_lossy(&presentation.metadata).into_owned(),
        }
    }
}

/// Request payload for revoking a credential
#[derive(Serialize, Deserialize)]
struct RevokeCredentialRequest {
    reason: String,
}

/// Request payload for a token-style transfer
#[derive(Serialize, Deserialize)]
struct TransferRequest {
    from: Address,
    to: Address,
}

/// Request payload for verifying a scanned presentation
#[derive(Serialize, Deserialize)]
struct VerifyPresentationRequest {
    payload: String,
    /// Extended metadata carried alongside the payload (offline only)
    #[serde(default)]
    metadata: Option<String>,
}

#[derive(Deserialize)]
struct AuditLogQuery {
    since: Option<u64>,
}

/// Failures surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    #[error(transparent)]
    Presentation(#[from] PresentationError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

fn ledger_status(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::Unauthorized { .. } | LedgerError::NotSupported(_) => StatusCode::FORBIDDEN,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadyExists(_) | LedgerError::AlreadyRevoked(_) => StatusCode::CONFLICT,
        LedgerError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn issuance_status(error: &IssuanceError) -> StatusCode {
    match error {
        IssuanceError::Ledger(e) => ledger_status(e),
        IssuanceError::Storage(StorageError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        IssuanceError::Storage(_) => StatusCode::BAD_GATEWAY,
        IssuanceError::Signer(_) | IssuanceError::Presentation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        IssuanceError::PresentationFailed { source, .. } => issuance_status(source),
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(e) => ledger_status(e),
            ApiError::Issuance(e) => issuance_status(e),
            ApiError::Presentation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        } else {
            log::debug!("request rejected: {}", self);
        }
        let mut body = json!({ "error": self.to_string() });
        // A minted credential must stay discoverable even when the request failed
        if let ApiError::Issuance(e) = &self {
            if let Some(id) = e.credential_id() {
                body["credentialId"] = json!(id);
            }
        }
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Parses a path segment as an account address, with or without `0x`.
fn parse_address(raw: &str) -> Result<Address, ApiError> {
    let bare = raw.strip_prefix("0x").unwrap_or(raw);
    Address::from_str(bare).map_err(|e| ApiError::BadRequest(format!("invalid address {:?}: {}", raw, e)))
}

/// Main API server structure holding all service dependencies
///
/// Cloned into the router state; every field is shared behind an `Arc`.
#[derive(Clone)]
pub struct ApiServer {
    /// Registry, ledger and event log
    deployment: Deployment,
    /// Issuer-side service acting as the server wallet
    credential_issuer: Arc<CredentialIssuer>,
    /// Verification engine
    verifier: Arc<Verifier>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `deployment` - Registry and ledger to serve
    /// * `credential_issuer` - Issuance service; its identity is the caller of every write
    /// * `verifier` - Presentation verifier
    pub fn new(deployment: Deployment, credential_issuer: CredentialIssuer, verifier: Verifier) -> Self {
        ApiServer {
            deployment,
            credential_issuer: Arc::new(credential_issuer),
            verifier: Arc::new(verifier),
        }
    }

    fn caller(&self) -> Address {
        self.credential_issuer.identity()
    }

    /// Builds the router with all API routes
    pub fn router(&self) -> Router {
        Router::new()
            .route("/issuers", get(Self::list_issuers_handler).post(Self::register_issuer_handler))
            .route("/issuers/:identity", get(Self::get_issuer_handler).put(Self::update_issuer_handler))
            .route("/issuers/:identity/activate", post(Self::activate_issuer_handler))
            .route("/issuers/:identity/deactivate", post(Self::deactivate_issuer_handler))
            .route("/issuers/:identity/credentials", get(Self::issued_by_handler))
            .route("/issuer-names/:name", get(Self::issuer_by_name_handler))
            .route("/credentials", post(Self::issue_credential_handler))
            .route("/credentials/:id", get(Self::get_credential_handler))
            .route("/credentials/:id/verify", get(Self::verify_credential_handler))
            .route("/credentials/:id/revoke", post(Self::revoke_credential_handler))
            .route("/credentials/:id/present", post(Self::present_credential_handler))
            .route("/credentials/:id/transfer", post(Self::transfer_credential_handler))
            .route("/holders/:address/credentials", get(Self::credentials_of_handler))
            .route("/presentations/verify", post(Self::verify_presentation_handler))
            .route("/presentations/verify-offline", post(Self::verify_offline_handler))
            .route("/audit-log", get(Self::audit_log_handler))
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    ///
    /// # Errors
    /// Returns the I/O error if the address cannot be bound or serving fails.
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!(
            "API server listening on http://{} as {}",
            addr,
            format_address(&self.caller())
        );
        axum::serve(listener, app).await
    }

    // =====================
    // Issuer Registry Handlers
    // =====================

    /// Registers a new issuer
    ///
    /// # Endpoint
    /// POST /issuers
    ///
    /// # Responses
    /// - 201 Created: Returns the issuer record
    /// - 403 Forbidden: Server wallet is not an administrator
    /// - 409 Conflict: Identity or name already registered
    async fn register_issuer_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<RegisterIssuerRequest>,
    ) -> Result<impl IntoResponse, ApiError> {
        let issuer = state.deployment.registry.register(
            state.caller(),
            payload.identity,
            &payload.name,
            payload.profile,
        )?;
        Ok((StatusCode::CREATED, Json(issuer)))
    }

    /// Lists all issuers in registration order
    ///
    /// # Endpoint
    /// GET /issuers
    async fn list_issuers_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        Json(state.deployment.registry.list_all())
    }

    /// # Endpoint
    /// GET /issuers/:identity
    async fn get_issuer_handler(
        State(state): State<Arc<ApiServer>>,
        Path(identity): Path<String>,
    ) -> ApiResult<Issuer> {
        let identity = parse_address(&identity)?;
        Ok(Json(state.deployment.registry.get(identity)?))
    }

    /// Resolves an issuer name to its identity
    ///
    /// # Endpoint
    /// GET /issuer-names/:name
    async fn issuer_by_name_handler(
        State(state): State<Arc<ApiServer>>,
        Path(name): Path<String>,
    ) -> ApiResult<serde_json::Value> {
        let identity = state
            .deployment
            .registry
            .get_by_name(&name)
            .ok_or_else(|| LedgerError::NotFound(format!("issuer name {:?}", name)))?;
        Ok(Json(json!({ "name": name, "identity": identity })))
    }

    /// Replaces an issuer's profile
    ///
    /// # Endpoint
    /// PUT /issuers/:identity
    async fn update_issuer_handler(
        State(state): State<Arc<ApiServer>>,
        Path(identity): Path<String>,
        Json(profile): Json<IssuerProfile>,
    ) -> ApiResult<Issuer> {
        let identity = parse_address(&identity)?;
        Ok(Json(state.deployment.registry.update(state.caller(), identity, profile)?))
    }

    /// # Endpoint
    /// POST /issuers/:identity/activate
    async fn activate_issuer_handler(
        State(state): State<Arc<ApiServer>>,
        Path(identity): Path<String>,
    ) -> Result<StatusCode, ApiError> {
        let identity = parse_address(&identity)?;
        state.deployment.registry.activate(state.caller(), identity)?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// Deactivates an issuer, invalidating all of its credentials
    ///
    /// # Endpoint
    /// POST /issuers/:identity/deactivate
    async fn deactivate_issuer_handler(
        State(state): State<Arc<ApiServer>>,
        Path(identity): Path<String>,
    ) -> Result<StatusCode, ApiError> {
        let identity = parse_address(&identity)?;
        state.deployment.registry.deactivate(state.caller(), identity)?;
        Ok(StatusCode::NO_CONTENT)
    }

    // =====================
    // Credential Ledger Handlers
    // =====================

    /// Issues a credential as the server wallet and returns its presentation
    ///
    /// # Endpoint
    /// POST /credentials
    ///
    /// # Responses
    /// - 201 Created: Credential id and presentation bundle
    /// - 403 Forbidden: Server wallet is not an active issuer
    /// - 422 Unprocessable Entity: Missing fields or past expiry
    /// - 502 Bad Gateway: Metadata could not be pinned. If the credential was
    ///   already minted the body carries its `credentialId`; retry with
    ///   `POST /credentials/:id/present` rather than issuing again
    async fn issue_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<IssueCredentialRequest>,
    ) -> Result<impl IntoResponse, ApiError> {
        let (_, presentation) = state
            .credential_issuer
            .issue_credential(payload.credential, payload.presentation)
            .await?;
        Ok((StatusCode::CREATED, Json(PresentationResponse::from(presentation))))
    }

    /// # Endpoint
    /// GET /credentials/:id
    async fn get_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<u64>,
    ) -> ApiResult<Credential> {
        Ok(Json(state.deployment.ledger.get(id)?))
    }

    /// Reports the ledger's current validity verdict for a credential
    ///
    /// # Endpoint
    /// GET /credentials/:id/verify
    async fn verify_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<u64>,
    ) -> ApiResult<CredentialVerification> {
        Ok(Json(state.deployment.ledger.verify(id)?))
    }

    /// Revokes a credential issued by the server wallet
    ///
    /// # Endpoint
    /// POST /credentials/:id/revoke
    ///
    /// # Responses
    /// - 204 No Content: Revoked
    /// - 403 Forbidden: Server wallet is not the credential's issuer
    /// - 409 Conflict: Already revoked
    async fn revoke_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<u64>,
        Json(payload): Json<RevokeCredentialRequest>,
    ) -> Result<StatusCode, ApiError> {
        state.credential_issuer.revoke_credential(id, &payload.reason)?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// Builds a fresh presentation bundle for an existing credential
    ///
    /// # Endpoint
    /// POST /credentials/:id/present
    async fn present_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<u64>,
        Json(options): Json<PresentationOptions>,
    ) -> ApiResult<PresentationResponse> {
        let presentation = state.credential_issuer.present(id, options).await?;
        Ok(Json(PresentationResponse::from(presentation)))
    }

    /// Token-style transfer; credentials are soulbound so this always fails
    ///
    /// # Endpoint
    /// POST /credentials/:id/transfer
    async fn transfer_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<u64>,
        Json(payload): Json<TransferRequest>,
    ) -> Result<StatusCode, ApiError> {
        state
            .deployment
            .ledger
            .transfer_from(state.caller(), payload.from, payload.to, id)?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// # Endpoint
    /// GET /holders/:address/credentials
    async fn credentials_of_handler(
        State(state): State<Arc<ApiServer>>,
        Path(address): Path<String>,
    ) -> ApiResult<Vec<Credential>> {
        let holder = parse_address(&address)?;
        Ok(Json(state.deployment.ledger.credentials_of(holder)))
    }

    /// # Endpoint
    /// GET /issuers/:identity/credentials
    async fn issued_by_handler(
        State(state): State<Arc<ApiServer>>,
        Path(identity): Path<String>,
    ) -> ApiResult<Vec<Credential>> {
        let issuer = parse_address(&identity)?;
        Ok(Json(state.deployment.ledger.issued_by(issuer)))
    }

    // =====================
    // Verification Handlers
    // =====================

    /// Verifies a scanned presentation against the ledger
    ///
    /// # Endpoint
    /// POST /presentations/verify
    ///
    /// # Responses
    /// - 200 OK: Verification result (valid or not)
    /// - 400 Bad Request: Payload is unreadable or malformed
    async fn verify_presentation_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<VerifyPresentationRequest>,
    ) -> ApiResult<VerificationResult> {
        Ok(Json(state.verifier.verify_online(payload.payload.as_bytes()).await?))
    }

    /// Structural verification without consulting the ledger
    ///
    /// # Endpoint
    /// POST /presentations/verify-offline
    async fn verify_offline_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<VerifyPresentationRequest>,
    ) -> ApiResult<VerificationResult> {
        let metadata = payload
            .metadata
            .ok_or_else(|| ApiError::BadRequest("offline verification needs `metadata`".into()))?;
        Ok(Json(
            state
                .verifier
                .verify_offline(payload.payload.as_bytes(), metadata.as_bytes())?,
        ))
    }

    // =====================
    // Audit
    // =====================

    /// Returns ledger events, optionally only those after a sequence number
    ///
    /// # Endpoint
    /// GET /audit-log?since=N
    async fn audit_log_handler(
        State(state): State<Arc<ApiServer>>,
        Query(query): Query<AuditLogQuery>,
    ) -> impl IntoResponse {
        let events = match query.since {
            Some(sequence) => state.deployment.events.since(sequence),
            None => state.deployment.events.all(),
        };
        Json(json!({ "events": events }))
    }
}
