use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountAddress, IntentHash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TransactionStatus {
    #[default]
    Unknown,
    CommittedSuccess,
    CommittedFailure,
    Pending,
    Rejected,
}

impl TransactionStatus {
    pub fn is_failure(self) -> bool {
        matches!(self, Self::CommittedFailure | Self::Rejected)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusRequest {
    pub intent_hash: IntentHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusResponse {
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedDetailsOptIns {
    pub affected_global_entities: bool,
    pub receipt_state_changes: bool,
}

impl Default for CommittedDetailsOptIns {
    fn default() -> Self {
        Self {
            affected_global_entities: true,
            receipt_state_changes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedDetailsRequest {
    pub intent_hash: IntentHash,
    #[serde(default)]
    pub opt_ins: CommittedDetailsOptIns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedDetailsResponse {
    pub transaction: CommittedTransactionInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedTransactionInfo {
    #[serde(default)]
    pub transaction_status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_hash: Option<IntentHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub affected_global_entities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<TransactionReceipt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TransactionReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_updates: Option<StateUpdates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StateUpdates {
    #[serde(default)]
    pub new_global_entities: Vec<NewGlobalEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGlobalEntity {
    pub entity_type: String,
    pub entity_address: String,
    #[serde(default)]
    pub is_global: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDetailsRequest {
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDetailsResponse {
    #[serde(default)]
    pub items: Vec<EntityDetailsItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDetailsItem {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<EntityDetails>,
}

impl EntityDetailsItem {
    pub fn state_fields(&self) -> &[StateField] {
        self.details
            .as_ref()
            .and_then(|details| details.state.as_ref())
            .map(|state| state.fields.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDetails {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ComponentState>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComponentState {
    #[serde(default)]
    pub fields: Vec<StateField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateField {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl StateField {
    /// Scalar fields carry a string or number `value`; composite ones carry none.
    pub fn value_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountsQuantifier {
    AtLeast,
    Exactly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsRequest {
    pub quantifier: AccountsQuantifier,
    pub quantity: u32,
}

impl AccountsRequest {
    pub fn at_least(quantity: u32) -> Self {
        Self {
            quantifier: AccountsQuantifier::AtLeast,
            quantity,
        }
    }

    pub fn exactly(quantity: u32) -> Self {
        Self {
            quantifier: AccountsQuantifier::Exactly,
            quantity,
        }
    }
}

impl Default for AccountsRequest {
    fn default() -> Self {
        Self::at_least(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub address: AccountAddress,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub appearance_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub identity_address: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WalletData {
    #[serde(default)]
    pub accounts: Vec<WalletAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionInput {
    pub transaction_manifest: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_intent_hash: Option<IntentHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
