use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! address_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn kind(&self) -> EntityKind {
                EntityKind::of(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

address_newtype!(AccountAddress);
address_newtype!(ComponentAddress);
address_newtype!(ResourceAddress);
address_newtype!(PackageAddress);
address_newtype!(IntentHash);

/// Entity class encoded in the human-readable prefix of a ledger address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Component,
    Resource,
    Package,
    Other,
}

impl EntityKind {
    pub fn of(address: &str) -> Self {
        if address.starts_with("account_") {
            Self::Account
        } else if address.starts_with("component_") {
            Self::Component
        } else if address.starts_with("resource_") {
            Self::Resource
        } else if address.starts_with("package_") {
            Self::Package
        } else {
            Self::Other
        }
    }

    /// Maps a gateway `entity_type` (e.g. `GlobalFungibleResource`) to a kind.
    pub fn from_gateway_type(entity_type: &str) -> Self {
        if entity_type.contains("Account") {
            Self::Account
        } else if entity_type.contains("Resource") {
            Self::Resource
        } else if entity_type.contains("Package") {
            Self::Package
        } else if entity_type.contains("Component") {
            Self::Component
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeRole {
    Admin,
    Owner,
}

impl fmt::Display for BadgeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadgeRole::Admin => f.write_str("admin badge"),
            BadgeRole::Owner => f.write_str("owner badge"),
        }
    }
}
