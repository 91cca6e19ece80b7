//! Interaction controller for a gumball-machine dApp: builds manifests from
//! session state, submits them through a wallet and reads results back from
//! the gateway.

pub mod action;
pub mod controller;
pub mod extraction;
pub mod gateway;
pub mod session;

pub use action::{Action, ActionContext, ActionError, ActionOutcome, FieldSelector};
pub use controller::{ControllerEvent, ControllerSettings, InteractionController};
pub use extraction::{AddressExtraction, ExtractionError, InstantiatedAddresses, PositionalLayout};
pub use gateway::{Gateway, HttpGateway, MissingGateway};
pub use session::SessionState;
