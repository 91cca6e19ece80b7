//! Locating the addresses an instantiation created from its committed details.

use shared::{
    domain::{ComponentAddress, EntityKind, ResourceAddress},
    protocol::CommittedTransactionInfo,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiatedAddresses {
    pub component: ComponentAddress,
    pub admin_badge: ResourceAddress,
    pub owner_badge: ResourceAddress,
    pub item_resource: ResourceAddress,
}

/// Indices into `affected_global_entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionalLayout {
    pub component: usize,
    pub admin_badge: usize,
    pub owner_badge: usize,
    pub item_resource: usize,
}

impl Default for PositionalLayout {
    fn default() -> Self {
        Self {
            component: 2,
            admin_badge: 3,
            owner_badge: 4,
            item_resource: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressExtraction {
    /// Reads `receipt.state_updates.new_global_entities` and assigns roles by
    /// entity type: the first new component, then new resources in creation
    /// order as admin badge, owner badge, item resource.
    #[default]
    ByEntityType,
    Positional(PositionalLayout),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("affected entity #{index} ({role}) missing; response listed {available}")]
    MissingPosition {
        role: &'static str,
        index: usize,
        available: usize,
    },
    #[error("committed details carry no receipt state updates")]
    NoStateUpdates,
    #[error("no newly created {0} in committed details")]
    MissingRole(&'static str),
}

impl AddressExtraction {
    pub fn extract(
        &self,
        transaction: &CommittedTransactionInfo,
    ) -> Result<InstantiatedAddresses, ExtractionError> {
        match self {
            AddressExtraction::Positional(layout) => positional(layout, transaction),
            AddressExtraction::ByEntityType => by_entity_type(transaction),
        }
    }
}

fn positional(
    layout: &PositionalLayout,
    transaction: &CommittedTransactionInfo,
) -> Result<InstantiatedAddresses, ExtractionError> {
    let entities = &transaction.affected_global_entities;
    let at = |role: &'static str, index: usize| {
        entities
            .get(index)
            .cloned()
            .ok_or(ExtractionError::MissingPosition {
                role,
                index,
                available: entities.len(),
            })
    };

    Ok(InstantiatedAddresses {
        component: ComponentAddress::new(at("component", layout.component)?),
        admin_badge: ResourceAddress::new(at("admin badge", layout.admin_badge)?),
        owner_badge: ResourceAddress::new(at("owner badge", layout.owner_badge)?),
        item_resource: ResourceAddress::new(at("item resource", layout.item_resource)?),
    })
}

fn by_entity_type(
    transaction: &CommittedTransactionInfo,
) -> Result<InstantiatedAddresses, ExtractionError> {
    let created = transaction
        .receipt
        .as_ref()
        .and_then(|receipt| receipt.state_updates.as_ref())
        .ok_or(ExtractionError::NoStateUpdates)?
        .new_global_entities
        .iter();

    let mut component = None;
    let mut resources = Vec::new();
    for entity in created {
        match EntityKind::from_gateway_type(&entity.entity_type) {
            EntityKind::Component if component.is_none() => {
                component = Some(entity.entity_address.clone());
            }
            EntityKind::Resource => resources.push(entity.entity_address.clone()),
            _ => {}
        }
    }

    let mut resources = resources.into_iter();
    let mut next_resource = |role: &'static str| {
        resources
            .next()
            .map(ResourceAddress::new)
            .ok_or(ExtractionError::MissingRole(role))
    };

    Ok(InstantiatedAddresses {
        component: component
            .map(ComponentAddress::new)
            .ok_or(ExtractionError::MissingRole("component"))?,
        admin_badge: next_resource("admin badge")?,
        owner_badge: next_resource("owner badge")?,
        item_resource: next_resource("item resource")?,
    })
}

#[cfg(test)]
mod tests {
    use shared::protocol::{NewGlobalEntity, StateUpdates, TransactionReceipt};

    use super::*;

    fn committed(entities: &[&str], created: &[(&str, &str)]) -> CommittedTransactionInfo {
        CommittedTransactionInfo {
            transaction_status: Default::default(),
            intent_hash: None,
            confirmed_at: None,
            affected_global_entities: entities.iter().map(|e| e.to_string()).collect(),
            receipt: Some(TransactionReceipt {
                state_updates: Some(StateUpdates {
                    new_global_entities: created
                        .iter()
                        .map(|(kind, address)| NewGlobalEntity {
                            entity_type: kind.to_string(),
                            entity_address: address.to_string(),
                            is_global: true,
                        })
                        .collect(),
                }),
                ..TransactionReceipt::default()
            }),
        }
    }

    #[test]
    fn positional_reads_fixed_indices() {
        let tx = committed(
            &["tx0", "tx1", "comp", "admin", "owner", "vault", "gum"],
            &[],
        );
        let addresses = AddressExtraction::Positional(PositionalLayout::default())
            .extract(&tx)
            .expect("extract");
        assert_eq!(addresses.component, ComponentAddress::new("comp"));
        assert_eq!(addresses.admin_badge, ResourceAddress::new("admin"));
        assert_eq!(addresses.owner_badge, ResourceAddress::new("owner"));
        assert_eq!(addresses.item_resource, ResourceAddress::new("gum"));
    }

    #[test]
    fn positional_fails_whole_when_list_is_short() {
        let tx = committed(&["a", "b", "c", "d", "e"], &[]);
        let err = AddressExtraction::Positional(PositionalLayout::default())
            .extract(&tx)
            .expect_err("short list");
        assert_eq!(
            err,
            ExtractionError::MissingPosition {
                role: "item resource",
                index: 6,
                available: 5,
            }
        );
    }

    #[test]
    fn by_entity_type_ignores_list_order_of_unrelated_entities() {
        let tx = committed(
            &[],
            &[
                ("GlobalFungibleResource", "resource_admin"),
                ("GlobalAccount", "account_new"),
                ("GlobalGenericComponent", "component_gumball"),
                ("GlobalFungibleResource", "resource_owner"),
                ("GlobalNonFungibleResource", "resource_gum"),
            ],
        );
        let addresses = AddressExtraction::ByEntityType
            .extract(&tx)
            .expect("extract");
        assert_eq!(
            addresses.component,
            ComponentAddress::new("component_gumball")
        );
        assert_eq!(addresses.admin_badge, ResourceAddress::new("resource_admin"));
        assert_eq!(addresses.owner_badge, ResourceAddress::new("resource_owner"));
        assert_eq!(addresses.item_resource, ResourceAddress::new("resource_gum"));
    }

    #[test]
    fn by_entity_type_requires_state_updates() {
        let mut tx = committed(&[], &[]);
        tx.receipt = None;
        assert_eq!(
            AddressExtraction::ByEntityType.extract(&tx),
            Err(ExtractionError::NoStateUpdates)
        );
    }

    #[test]
    fn by_entity_type_reports_missing_resource_role() {
        let tx = committed(
            &[],
            &[
                ("GlobalGenericComponent", "component_gumball"),
                ("GlobalFungibleResource", "resource_admin"),
            ],
        );
        assert_eq!(
            AddressExtraction::ByEntityType.extract(&tx),
            Err(ExtractionError::MissingRole("owner badge"))
        );
    }
}
