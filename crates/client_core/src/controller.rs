use std::{path::PathBuf, sync::Arc};

use shared::{
    domain::{AccountAddress, IntentHash, ResourceAddress},
    protocol::TransactionStatus,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use wallet_integration::WalletConnector;

use crate::{
    action::{Action, ActionContext, ActionError, ActionOutcome},
    extraction::{AddressExtraction, InstantiatedAddresses},
    gateway::Gateway,
    session::SessionState,
};

/// Stokenet XRD.
pub const DEFAULT_XRD_RESOURCE: &str =
    "resource_tdx_2_1tknxxxxxxxxxradxrdxxxxxxxxx009923554798xxxxxxxxxtfd2jc";
pub const DEFAULT_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub xrd_resource: ResourceAddress,
    pub manifest_version: u32,
    pub extraction: AddressExtraction,
    pub manifest_dump_dir: Option<PathBuf>,
    pub transaction_message: Option<String>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            xrd_resource: ResourceAddress::new(DEFAULT_XRD_RESOURCE),
            manifest_version: DEFAULT_MANIFEST_VERSION,
            extraction: AddressExtraction::default(),
            manifest_dump_dir: None,
            transaction_message: None,
        }
    }
}

/// UI-facing notifications, one per finished action.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    AccountConnected {
        address: AccountAddress,
        label: String,
    },
    ComponentInstantiated {
        intent_hash: IntentHash,
        addresses: InstantiatedAddresses,
    },
    TransactionCommitted {
        action: String,
        intent_hash: IntentHash,
        status: TransactionStatus,
    },
    QueryAnswered {
        field: String,
        value: String,
    },
    ActionFailed {
        action: String,
        message: String,
    },
}

impl ControllerEvent {
    fn from_outcome(action: &str, outcome: &ActionOutcome) -> Self {
        match outcome {
            ActionOutcome::Connected { account } => ControllerEvent::AccountConnected {
                address: account.address.clone(),
                label: account.label.clone(),
            },
            ActionOutcome::Instantiated {
                intent_hash,
                addresses,
            } => ControllerEvent::ComponentInstantiated {
                intent_hash: intent_hash.clone(),
                addresses: addresses.clone(),
            },
            ActionOutcome::Committed {
                intent_hash,
                status,
                ..
            } => ControllerEvent::TransactionCommitted {
                action: action.to_string(),
                intent_hash: intent_hash.clone(),
                status: *status,
            },
            ActionOutcome::Answered { field, value } => ControllerEvent::QueryAnswered {
                field: field.clone(),
                value: value.clone(),
            },
        }
    }
}

/// Runs actions against one session.
///
/// `dispatch` takes `&mut self`, so actions on one controller run one at a
/// time and the session only ever sees complete updates.
pub struct InteractionController {
    wallet: Arc<dyn WalletConnector>,
    gateway: Arc<dyn Gateway>,
    session: SessionState,
    settings: ControllerSettings,
    events: broadcast::Sender<ControllerEvent>,
}

impl InteractionController {
    pub fn new(
        wallet: Arc<dyn WalletConnector>,
        gateway: Arc<dyn Gateway>,
        settings: ControllerSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            wallet,
            gateway,
            session: SessionState::default(),
            settings,
            events,
        }
    }

    pub fn with_session(mut self, session: SessionState) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Manifest text `action` would submit right now, without submitting it.
    pub fn preview(&self, action: &Action) -> Result<Option<String>, ActionError> {
        Ok(action
            .build_manifest(&self.session, &self.settings)?
            .map(|manifest| manifest.to_manifest_string()))
    }

    pub async fn dispatch(&mut self, action: Action) -> Result<ActionOutcome, ActionError> {
        let label = action.label();
        info!(action = %label, wallet_mode = ?self.wallet.mode(), "controller: dispatch");

        let mut ctx = ActionContext {
            session: &mut self.session,
            wallet: self.wallet.as_ref(),
            gateway: self.gateway.as_ref(),
            settings: &self.settings,
        };
        let result = action.execute(&mut ctx).await;

        match &result {
            Ok(outcome) => {
                let _ = self
                    .events
                    .send(ControllerEvent::from_outcome(&label, outcome));
            }
            Err(err) => {
                warn!(action = %label, error = %err, "controller: action failed");
                let _ = self.events.send(ControllerEvent::ActionFailed {
                    action: label,
                    message: err.to_string(),
                });
            }
        }
        result
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
