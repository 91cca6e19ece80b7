use rust_decimal::Decimal;
use shared::domain::{
    AccountAddress, BadgeRole, ComponentAddress, PackageAddress, ResourceAddress,
};

use crate::{action::ActionError, extraction::InstantiatedAddresses};

/// Addresses and values learned by earlier actions, read by later ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub account: Option<AccountAddress>,
    pub account_label: Option<String>,
    pub package: Option<PackageAddress>,
    pub component: Option<ComponentAddress>,
    pub admin_badge: Option<ResourceAddress>,
    pub owner_badge: Option<ResourceAddress>,
    pub item_resource: Option<ResourceAddress>,
    pub price: Option<Decimal>,
}

impl SessionState {
    pub fn require_account(&self) -> Result<&AccountAddress, ActionError> {
        self.account
            .as_ref()
            .ok_or(ActionError::MissingSession("account address"))
    }

    pub fn require_component(&self) -> Result<&ComponentAddress, ActionError> {
        self.component
            .as_ref()
            .ok_or(ActionError::MissingSession("component address"))
    }

    pub fn badge(&self, role: BadgeRole) -> Option<&ResourceAddress> {
        match role {
            BadgeRole::Admin => self.admin_badge.as_ref(),
            BadgeRole::Owner => self.owner_badge.as_ref(),
        }
    }

    pub fn require_badge(&self, role: BadgeRole) -> Result<&ResourceAddress, ActionError> {
        self.badge(role).ok_or(ActionError::MissingSession(match role {
            BadgeRole::Admin => "admin badge address",
            BadgeRole::Owner => "owner badge address",
        }))
    }

    pub(crate) fn apply_instantiated(
        &mut self,
        package: PackageAddress,
        addresses: InstantiatedAddresses,
        price: Option<Decimal>,
    ) {
        self.package = Some(package);
        self.component = Some(addresses.component);
        self.admin_badge = Some(addresses.admin_badge);
        self.owner_badge = Some(addresses.owner_badge);
        self.item_resource = Some(addresses.item_resource);
        if price.is_some() {
            self.price = price;
        }
    }

    /// Label/value rows for display; unset values render as `-`.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        fn show<T: ToString>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        }

        vec![
            ("account", show(&self.account)),
            ("account label", show(&self.account_label)),
            ("package", show(&self.package)),
            ("component", show(&self.component)),
            ("admin badge", show(&self.admin_badge)),
            ("owner badge", show(&self.owner_badge)),
            ("item resource", show(&self.item_resource)),
            ("price", show(&self.price)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_are_reported_by_name() {
        let session = SessionState::default();
        let err = session.require_badge(BadgeRole::Owner).expect_err("unset");
        assert!(matches!(err, ActionError::MissingSession("owner badge address")));
        assert!(session.require_account().is_err());
    }

    #[test]
    fn describe_renders_unset_values_as_dash() {
        let session = SessionState {
            account: Some(AccountAddress::new("account_1")),
            ..SessionState::default()
        };
        let rows = session.describe();
        assert_eq!(rows[0], ("account", "account_1".to_string()));
        assert_eq!(rows[3], ("component", "-".to_string()));
    }
}
