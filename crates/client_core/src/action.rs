//! User-triggered actions and the build → submit → read back pipeline.

use std::path::Path;

use manifest::{ManifestBuilder, ManifestValue, TransactionManifest};
use rust_decimal::Decimal;
use shared::{
    domain::{BadgeRole, IntentHash, PackageAddress, ResourceAddress},
    protocol::{
        AccountsRequest, CommittedTransactionInfo, SendTransactionInput, TransactionReceipt,
        TransactionStatus, WalletAccount, WalletData,
    },
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wallet_integration::{WalletConnector, WalletError};

use crate::{
    extraction::{ExtractionError, InstantiatedAddresses},
    gateway::Gateway,
    session::SessionState,
    ControllerSettings,
};

pub const GUMBALL_BLUEPRINT: &str = "GumballMachine";
pub const GUMBALL_INSTANTIATE: &str = "instantiate_gumball_machine";

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0} is not set; run the action that provides it first")]
    MissingSession(&'static str),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("gateway request failed: {0:#}")]
    Gateway(anyhow::Error),
    #[error("transaction {intent_hash} failed with status {status:?}: {message}")]
    TransactionFailed {
        intent_hash: IntentHash,
        status: TransactionStatus,
        message: String,
    },
    #[error("could not locate instantiated addresses: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("component state has no field {0}")]
    FieldNotFound(String),
    #[error("failed to write manifest dump: {0}")]
    ManifestDump(#[from] std::io::Error),
}

/// Which entry of a component's state fields a query reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelector {
    Named(String),
    Index(usize),
}

impl std::fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldSelector::Named(name) => f.write_str(name),
            FieldSelector::Index(index) => write!(f, "#{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Connect {
        request: AccountsRequest,
    },
    Instantiate {
        package: PackageAddress,
        blueprint: String,
        function: String,
        args: Vec<ManifestValue>,
        /// Price the new component starts with, remembered in the session.
        price: Option<Decimal>,
    },
    /// Pays `amount` of `resource` into a method. `None` falls back to the
    /// session price and the configured XRD resource.
    Invoke {
        method: String,
        resource: Option<ResourceAddress>,
        amount: Option<Decimal>,
    },
    AdminInvoke {
        method: String,
        badge: BadgeRole,
        args: Vec<ManifestValue>,
        /// Set when a successful call changes the component price.
        sets_price: Option<Decimal>,
    },
    Query {
        field: FieldSelector,
        records_price: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Connected {
        account: WalletAccount,
    },
    Instantiated {
        intent_hash: IntentHash,
        addresses: InstantiatedAddresses,
    },
    Committed {
        intent_hash: IntentHash,
        status: TransactionStatus,
        receipt: Option<TransactionReceipt>,
    },
    Answered {
        field: String,
        value: String,
    },
}

/// Everything an action may read or mutate while it runs.
pub struct ActionContext<'a> {
    pub session: &'a mut SessionState,
    pub wallet: &'a dyn WalletConnector,
    pub gateway: &'a dyn Gateway,
    pub settings: &'a ControllerSettings,
}

impl Action {
    pub fn connect() -> Self {
        Action::Connect {
            request: AccountsRequest::at_least(1),
        }
    }

    pub fn instantiate_gumball_machine(
        package: PackageAddress,
        price: Decimal,
        flavor: impl Into<String>,
    ) -> Self {
        Action::Instantiate {
            package,
            blueprint: GUMBALL_BLUEPRINT.to_string(),
            function: GUMBALL_INSTANTIATE.to_string(),
            args: vec![price.into(), ManifestValue::String(flavor.into())],
            price: Some(price),
        }
    }

    pub fn buy_gumball(amount: Option<Decimal>) -> Self {
        Action::Invoke {
            method: "buy_gumball".to_string(),
            resource: None,
            amount,
        }
    }

    pub fn set_price(price: Decimal) -> Self {
        Action::AdminInvoke {
            method: "set_price".to_string(),
            badge: BadgeRole::Admin,
            args: vec![price.into()],
            sets_price: Some(price),
        }
    }

    pub fn withdraw_earnings() -> Self {
        Action::AdminInvoke {
            method: "withdraw_earnings".to_string(),
            badge: BadgeRole::Owner,
            args: Vec::new(),
            sets_price: None,
        }
    }

    pub fn mint_staff_badge(name: impl Into<String>) -> Self {
        Action::AdminInvoke {
            method: "mint_staff_badge".to_string(),
            badge: BadgeRole::Owner,
            args: vec![ManifestValue::String(name.into())],
            sets_price: None,
        }
    }

    pub fn get_price(field: FieldSelector) -> Self {
        Action::Query {
            field,
            records_price: true,
        }
    }

    /// Short name used in logs, events and manifest dump file names.
    pub fn label(&self) -> String {
        match self {
            Action::Connect { .. } => "connect".to_string(),
            Action::Instantiate { function, .. } => function.clone(),
            Action::Invoke { method, .. } | Action::AdminInvoke { method, .. } => method.clone(),
            Action::Query { field, .. } => format!("query {field}"),
        }
    }

    /// Builds the manifest this action submits; `None` for actions that sign nothing.
    ///
    /// Pure: identical session and settings give identical manifests.
    pub fn build_manifest(
        &self,
        session: &SessionState,
        settings: &ControllerSettings,
    ) -> Result<Option<TransactionManifest>, ActionError> {
        let manifest = match self {
            Action::Connect { .. } | Action::Query { .. } => return Ok(None),
            Action::Instantiate {
                package,
                blueprint,
                function,
                args,
                ..
            } => {
                let account = session.require_account()?;
                ManifestBuilder::new()
                    .call_function(package, blueprint, function, args.clone())
                    .deposit_batch(account)
                    .build()
            }
            Action::Invoke {
                method,
                resource,
                amount,
            } => {
                let account = session.require_account()?;
                let component = session.require_component()?;
                let resource = resource.as_ref().unwrap_or(&settings.xrd_resource);
                let amount = amount
                    .or(session.price)
                    .ok_or(ActionError::MissingSession("price"))?;
                ManifestBuilder::new()
                    .withdraw_from_account(account, resource, amount)
                    .take_all_from_worktop(resource, |builder, bucket| {
                        builder.call_method(component, method, vec![bucket.into()])
                    })
                    .deposit_batch(account)
                    .build()
            }
            Action::AdminInvoke {
                method,
                badge,
                args,
                ..
            } => {
                let account = session.require_account()?;
                let component = session.require_component()?;
                let badge = session.require_badge(*badge)?;
                ManifestBuilder::new()
                    .create_proof_from_account_of_amount(account, badge, Decimal::ONE)
                    .call_method(component, method, args.clone())
                    .deposit_batch(account)
                    .build()
            }
        };
        Ok(Some(manifest))
    }

    pub async fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        match self {
            Action::Connect { request } => connect(ctx, request).await,
            Action::Query {
                field,
                records_price,
            } => query(ctx, field, *records_price).await,
            Action::Instantiate { package, price, .. } => {
                let (intent_hash, transaction) = self.submit(ctx).await?;
                let addresses = ctx.settings.extraction.extract(&transaction)?;
                info!(
                    %intent_hash,
                    component = %addresses.component,
                    item_resource = %addresses.item_resource,
                    "action: component instantiated"
                );
                ctx.session
                    .apply_instantiated(package.clone(), addresses.clone(), *price);
                Ok(ActionOutcome::Instantiated {
                    intent_hash,
                    addresses,
                })
            }
            Action::Invoke { .. } | Action::AdminInvoke { .. } => {
                let (intent_hash, transaction) = self.submit(ctx).await?;
                if let Action::AdminInvoke {
                    sets_price: Some(price),
                    ..
                } = self
                {
                    ctx.session.price = Some(*price);
                }
                Ok(ActionOutcome::Committed {
                    intent_hash,
                    status: transaction.transaction_status,
                    receipt: transaction.receipt,
                })
            }
        }
    }

    /// Signs and submits through the wallet, then reads status and committed
    /// details once each. Nothing in the session is touched here.
    async fn submit(
        &self,
        ctx: &ActionContext<'_>,
    ) -> Result<(IntentHash, CommittedTransactionInfo), ActionError> {
        let manifest = self
            .build_manifest(&*ctx.session, ctx.settings)?
            .ok_or(ActionError::MissingSession("manifest"))?;
        let manifest_text = manifest.to_manifest_string();
        let label = self.label();

        if let Some(dir) = &ctx.settings.manifest_dump_dir {
            dump_manifest(dir, &label, &manifest_text).await?;
        }

        debug!(action = %label, instructions = manifest.instructions().len(), "action: submitting");
        let intent_hash = ctx
            .wallet
            .send_transaction(SendTransactionInput {
                transaction_manifest: manifest_text,
                version: ctx.settings.manifest_version,
                message: ctx.settings.transaction_message.clone(),
            })
            .await?;
        info!(action = %label, %intent_hash, "action: wallet accepted transaction");

        let status = ctx
            .gateway
            .transaction_status(&intent_hash)
            .await
            .map_err(ActionError::Gateway)?;
        if status.status.is_failure() {
            return Err(ActionError::TransactionFailed {
                intent_hash,
                status: status.status,
                message: status.error_message.unwrap_or_default(),
            });
        }

        let details = ctx
            .gateway
            .committed_details(&intent_hash)
            .await
            .map_err(ActionError::Gateway)?;
        let transaction = details.transaction;
        if transaction.transaction_status.is_failure() {
            let message = transaction
                .receipt
                .as_ref()
                .and_then(|receipt| receipt.error_message.clone())
                .unwrap_or_default();
            return Err(ActionError::TransactionFailed {
                intent_hash,
                status: transaction.transaction_status,
                message,
            });
        }
        Ok((intent_hash, transaction))
    }
}

async fn connect(
    ctx: &mut ActionContext<'_>,
    request: &AccountsRequest,
) -> Result<ActionOutcome, ActionError> {
    let data = match ctx.wallet.subscribe() {
        Some(mut deliveries) => {
            ctx.wallet.request_accounts(request).await?;
            first_delivery(&mut deliveries).await?
        }
        None => ctx.wallet.request_accounts(request).await?,
    };

    let account = data
        .accounts
        .into_iter()
        .next()
        .ok_or(WalletError::NoAccounts)?;
    info!(account = %account.address, label = %account.label, "action: account connected");
    ctx.session.account = Some(account.address.clone());
    ctx.session.account_label = Some(account.label.clone());
    Ok(ActionOutcome::Connected { account })
}

async fn first_delivery(
    deliveries: &mut watch::Receiver<Option<WalletData>>,
) -> Result<WalletData, WalletError> {
    let delivered = deliveries
        .wait_for(Option::is_some)
        .await
        .map_err(|_| WalletError::SubscriptionClosed)?;
    delivered.clone().ok_or(WalletError::SubscriptionClosed)
}

async fn query(
    ctx: &mut ActionContext<'_>,
    field: &FieldSelector,
    records_price: bool,
) -> Result<ActionOutcome, ActionError> {
    let component = ctx.session.require_component()?.clone();
    let item = ctx
        .gateway
        .entity_details(component.as_str())
        .await
        .map_err(ActionError::Gateway)?;

    let fields = item.state_fields();
    let selected = match field {
        FieldSelector::Named(name) => fields
            .iter()
            .find(|candidate| candidate.field_name.as_deref() == Some(name.as_str())),
        FieldSelector::Index(index) => fields.get(*index),
    };
    let value = selected
        .and_then(|state_field| state_field.value_text())
        .ok_or_else(|| ActionError::FieldNotFound(field.to_string()))?;

    if records_price {
        match value.parse::<Decimal>() {
            Ok(price) => ctx.session.price = Some(price),
            Err(_) => warn!(%component, %value, "action: queried price is not a decimal"),
        }
    }
    Ok(ActionOutcome::Answered {
        field: field.to_string(),
        value,
    })
}

async fn dump_manifest(dir: &Path, label: &str, text: &str) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let file_name: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let path = dir.join(format!("{file_name}.rtm"));
    tokio::fs::write(&path, text).await?;
    debug!(path = %path.display(), "action: manifest written");
    Ok(())
}

#[cfg(test)]
#[path = "tests/action_tests.rs"]
mod tests;
