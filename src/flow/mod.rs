//! The connect flow
//!
//! Twitter, then Telegram, then Wallet, then the scorecard. Each stage is a
//! [`ConnectPage`] gated on the [`FlowContext`]; the [`FlowRunner`] walks
//! them in order.
//!
//! # Architecture
//!
//! - [`Stage`] - The three stages and their built-in defaults
//! - [`FlowContext`] - Connected stages and scores, persisted as JSON
//! - [`KeyValueStore`] - Host storage (in-memory or file backed)
//! - [`Connector`] - External provider capability behind a trait
//! - [`ConnectPage`] - One stage owning one sequencer
//! - [`FlowRunner`] - Runs every stage and reports to a [`FlowObserver`]

pub mod connector;
pub mod context;
pub mod page;
pub mod runner;
pub mod stage;
pub mod store;

pub use connector::{ConnectedAccount, Connector, SimulatedConnector, suggest_provider};
pub use context::{CONTEXT_KEY, FlowContext, account_key};
pub use page::{ConnectPage, StageRun};
pub use runner::{DEFAULT_PROVIDER, FlowObserver, FlowRunner, NoopObserver, ObserverSet};
pub use stage::{Stage, VerificationMode};
pub use store::{FileStore, KeyValueStore, MemoryStore};
