use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::IntentHash,
    error::{ApiError, ApiException},
    protocol::{
        CommittedDetailsOptIns, CommittedDetailsRequest, CommittedDetailsResponse,
        EntityDetailsItem, EntityDetailsRequest, EntityDetailsResponse, TransactionStatusRequest,
        TransactionStatusResponse,
    },
};
use tracing::debug;

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn transaction_status(&self, intent_hash: &IntentHash)
        -> Result<TransactionStatusResponse>;
    async fn committed_details(&self, intent_hash: &IntentHash)
        -> Result<CommittedDetailsResponse>;
    async fn entity_details(&self, address: &str) -> Result<EntityDetailsItem>;
}

pub struct MissingGateway;

#[async_trait]
impl Gateway for MissingGateway {
    async fn transaction_status(
        &self,
        intent_hash: &IntentHash,
    ) -> Result<TransactionStatusResponse> {
        Err(anyhow!("gateway unavailable; cannot read status of {intent_hash}"))
    }

    async fn committed_details(
        &self,
        intent_hash: &IntentHash,
    ) -> Result<CommittedDetailsResponse> {
        Err(anyhow!("gateway unavailable; cannot read details of {intent_hash}"))
    }

    async fn entity_details(&self, address: &str) -> Result<EntityDetailsItem> {
        Err(anyhow!("gateway unavailable; cannot read state of {address}"))
    }
}

/// Gateway API client over HTTP.
pub struct HttpGateway {
    http: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        debug!(path, "gateway: request");
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("gateway {path} unreachable"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .with_context(|| format!("gateway {path} returned {status} with an unreadable body"))?;
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(ApiException::from(api_error))
                    .with_context(|| format!("gateway {path} returned {status}"));
            }
            return Err(anyhow!("gateway {path} returned {status}: {body}"));
        }

        response
            .json()
            .await
            .with_context(|| format!("gateway {path} returned an undecodable body"))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn transaction_status(
        &self,
        intent_hash: &IntentHash,
    ) -> Result<TransactionStatusResponse> {
        self.post(
            "/transaction/status",
            &TransactionStatusRequest {
                intent_hash: intent_hash.clone(),
            },
        )
        .await
    }

    async fn committed_details(
        &self,
        intent_hash: &IntentHash,
    ) -> Result<CommittedDetailsResponse> {
        self.post(
            "/transaction/committed-details",
            &CommittedDetailsRequest {
                intent_hash: intent_hash.clone(),
                opt_ins: CommittedDetailsOptIns::default(),
            },
        )
        .await
    }

    async fn entity_details(&self, address: &str) -> Result<EntityDetailsItem> {
        let response: EntityDetailsResponse = self
            .post(
                "/state/entity/details",
                &EntityDetailsRequest {
                    addresses: vec![address.to_string()],
                },
            )
            .await?;
        response
            .items
            .into_iter()
            .find(|item| item.address == address)
            .ok_or_else(|| anyhow!("gateway returned no details for {address}"))
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
