use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::{
    domain::IntentHash,
    protocol::{
        AccountsRequest, Persona, SendTransactionInput, SendTransactionOutput, WalletAccount,
        WalletData,
    },
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How account data reaches the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletMode {
    /// Account data is pushed on a watch channel after a request is registered.
    Subscription,
    /// Each request returns the account data directly.
    OneShot,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet rejected the request: {reason}")]
    Rejected {
        reason: String,
        message: Option<String>,
    },
    #[error("wallet sdk error: {0}")]
    Sdk(String),
    #[error("wallet transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("wallet shared no accounts")]
    NoAccounts,
    #[error("wallet data subscription closed before any delivery")]
    SubscriptionClosed,
}

impl WalletError {
    /// Maps a wallet error code (`rejectedByUser`, `failedToSubmitTransaction`, ...)
    /// to a variant.
    pub fn from_wallet_code(code: &str, message: Option<String>) -> Self {
        if code.starts_with("rejected") {
            WalletError::Rejected {
                reason: code.to_string(),
                message,
            }
        } else {
            match message {
                Some(message) => WalletError::Sdk(format!("{code}: {message}")),
                None => WalletError::Sdk(code.to_string()),
            }
        }
    }
}

#[async_trait]
pub trait WalletConnector: Send + Sync {
    fn mode(&self) -> WalletMode;

    async fn request_accounts(&self, request: &AccountsRequest) -> Result<WalletData, WalletError>;

    /// Push channel for wallet data; `None` for pull-only bindings.
    fn subscribe(&self) -> Option<watch::Receiver<Option<WalletData>>> {
        None
    }

    async fn send_transaction(&self, input: SendTransactionInput)
        -> Result<IntentHash, WalletError>;
}

pub struct MissingWallet;

#[async_trait]
impl WalletConnector for MissingWallet {
    fn mode(&self) -> WalletMode {
        WalletMode::OneShot
    }

    async fn request_accounts(
        &self,
        _request: &AccountsRequest,
    ) -> Result<WalletData, WalletError> {
        Err(WalletError::Sdk("wallet integration is unavailable".into()))
    }

    async fn send_transaction(
        &self,
        _input: SendTransactionInput,
    ) -> Result<IntentHash, WalletError> {
        Err(WalletError::Sdk("wallet integration is unavailable".into()))
    }
}

fn intent_hash_from_output(
    status: StatusCode,
    output: SendTransactionOutput,
) -> Result<IntentHash, WalletError> {
    if let Some(code) = output.error {
        return Err(WalletError::from_wallet_code(&code, output.message));
    }
    match output.transaction_intent_hash {
        Some(hash) if status.is_success() => Ok(hash),
        Some(_) => Err(WalletError::Sdk(format!(
            "wallet bridge returned {status} alongside an intent hash"
        ))),
        None => Err(WalletError::Sdk(format!(
            "wallet bridge returned {status} without an intent hash"
        ))),
    }
}

async fn decode_transaction_response(
    response: reqwest::Response,
) -> Result<IntentHash, WalletError> {
    let status = response.status();
    let body = response.text().await?;
    let output: SendTransactionOutput = serde_json::from_str(&body).map_err(|err| {
        WalletError::Sdk(format!(
            "undecodable wallet response (status {status}): {err}"
        ))
    })?;
    intent_hash_from_output(status, output)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolkitDataRequest<'a> {
    interaction_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    dapp_definition_address: Option<&'a str>,
    accounts: AccountsRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolkitDataResponse {
    #[serde(default)]
    accounts: Vec<WalletAccount>,
    #[serde(default)]
    persona: Option<Persona>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolkitTransactionRequest {
    interaction_id: Uuid,
    #[serde(flatten)]
    input: SendTransactionInput,
}

/// dApp-toolkit binding: account data is published to subscribers.
pub struct ToolkitWallet {
    http: Client,
    base_url: String,
    dapp_definition: Option<String>,
    data: watch::Sender<Option<WalletData>>,
}

impl ToolkitWallet {
    pub fn new(base_url: impl Into<String>, dapp_definition: Option<String>) -> Self {
        let (data, _) = watch::channel(None);
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dapp_definition,
            data,
        }
    }
}

#[async_trait]
impl WalletConnector for ToolkitWallet {
    fn mode(&self) -> WalletMode {
        WalletMode::Subscription
    }

    async fn request_accounts(&self, request: &AccountsRequest) -> Result<WalletData, WalletError> {
        let interaction_id = Uuid::new_v4();
        debug!(%interaction_id, ?request, "wallet: toolkit data request");
        let response: ToolkitDataResponse = self
            .http
            .post(format!("{}/wallet/data-request", self.base_url))
            .json(&ToolkitDataRequest {
                interaction_id,
                dapp_definition_address: self.dapp_definition.as_deref(),
                accounts: *request,
            })
            .send()
            .await?
            .json()
            .await?;

        if let Some(code) = response.error {
            warn!(%interaction_id, code = %code, "wallet: toolkit data request failed");
            return Err(WalletError::from_wallet_code(&code, response.message));
        }

        let data = WalletData {
            accounts: response.accounts,
            persona: response.persona,
        };
        info!(
            %interaction_id,
            accounts = data.accounts.len(),
            "wallet: toolkit delivered wallet data"
        );
        self.data.send_replace(Some(data.clone()));
        Ok(data)
    }

    fn subscribe(&self) -> Option<watch::Receiver<Option<WalletData>>> {
        Some(self.data.subscribe())
    }

    async fn send_transaction(
        &self,
        input: SendTransactionInput,
    ) -> Result<IntentHash, WalletError> {
        let interaction_id = Uuid::new_v4();
        debug!(%interaction_id, version = input.version, "wallet: toolkit send transaction");
        let response = self
            .http
            .post(format!("{}/wallet/send-transaction", self.base_url))
            .json(&ToolkitTransactionRequest {
                interaction_id,
                input,
            })
            .send()
            .await?;
        decode_transaction_response(response).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAccountsRequest {
    one_time_accounts_without_proof_of_ownership: AccountsRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAccountsResponse {
    #[serde(default)]
    one_time_accounts: Vec<WalletAccount>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Pre-toolkit wallet SDK binding: one request, one answer.
pub struct LegacySdkWallet {
    http: Client,
    base_url: String,
}

impl LegacySdkWallet {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl WalletConnector for LegacySdkWallet {
    fn mode(&self) -> WalletMode {
        WalletMode::OneShot
    }

    async fn request_accounts(&self, request: &AccountsRequest) -> Result<WalletData, WalletError> {
        let response: LegacyAccountsResponse = self
            .http
            .post(format!("{}/request", self.base_url))
            .json(&LegacyAccountsRequest {
                one_time_accounts_without_proof_of_ownership: *request,
            })
            .send()
            .await?
            .json()
            .await?;

        if let Some(code) = response.error {
            return Err(WalletError::from_wallet_code(&code, response.message));
        }
        info!(
            accounts = response.one_time_accounts.len(),
            "wallet: legacy sdk returned accounts"
        );
        Ok(WalletData {
            accounts: response.one_time_accounts,
            persona: None,
        })
    }

    async fn send_transaction(
        &self,
        input: SendTransactionInput,
    ) -> Result<IntentHash, WalletError> {
        debug!(version = input.version, "wallet: legacy sdk send transaction");
        let response = self
            .http
            .post(format!("{}/sendTransaction", self.base_url))
            .json(&input)
            .send()
            .await?;
        decode_transaction_response(response).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
