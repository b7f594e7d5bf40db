//! External connector seam.
//!
//! The flow never talks to a real wallet provider. It calls a
//! [`Connector`], which offers a set of provider capabilities, connects an
//! account, and reports verification progress for stages whose steps are
//! driven externally.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConnectError;
use crate::sequencer::{StepCompleter, StepList};

/// Providers the simulated connector offers.
pub const SIMULATED_PROVIDERS: [&str; 4] = ["metamask", "phantom", "walletconnect", "coinbase"];

/// Account returned by a successful connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    /// Provider that produced the account
    pub provider: String,
    /// Opaque account identifier (an address for wallets)
    pub account: String,
}

/// External connector capability.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Provider ids this environment offers.
    fn providers(&self) -> Vec<String>;

    /// Connects through `provider_id`.
    ///
    /// # Errors
    ///
    /// - `ConnectError::ConnectorUnavailable` if the provider is not offered.
    /// - `ConnectError::ConnectionRejected` if the call fails or the user
    ///   declines.
    async fn connect(&self, provider_id: &str) -> Result<ConnectedAccount, ConnectError>;

    /// Reports verification progress for `account`, one
    /// [`StepCompleter::complete_next`] per finished step.
    ///
    /// The default completes every step at once. Implementations should stop
    /// as soon as the completer reports the run is gone.
    async fn verify(&self, account: &ConnectedAccount, steps: &StepList, completer: StepCompleter) {
        debug!(provider = %account.provider, steps = steps.len(), "verifying account");
        for _ in steps.iter() {
            if !completer.complete_next() {
                break;
            }
        }
    }
}

/// Returns the closest offered provider when it is within a
/// Damerau-Levenshtein distance of 3.
#[must_use]
pub fn suggest_provider(input: &str, offered: &[String]) -> Option<String> {
    offered
        .iter()
        .map(|p| (p, strsim::damerau_levenshtein(input, p)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(p, _)| p.clone())
}

/// Checks that `connector` offers `provider`.
///
/// # Errors
///
/// Returns `ConnectError::ConnectorUnavailable`, with a suggestion when a
/// similar provider is offered.
pub fn ensure_offered(connector: &dyn Connector, provider: &str) -> Result<(), ConnectError> {
    let offered = connector.providers();
    if offered.iter().any(|p| p == provider) {
        return Ok(());
    }
    Err(ConnectError::ConnectorUnavailable {
        provider: provider.to_string(),
        suggestion: suggest_provider(provider, &offered),
    })
}

/// Connector that fabricates accounts and paces verification on a timer.
#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    providers: Vec<String>,
    rejecting: HashSet<String>,
    step_delay: Duration,
}

impl Default for SimulatedConnector {
    fn default() -> Self {
        Self {
            providers: SIMULATED_PROVIDERS.iter().map(ToString::to_string).collect(),
            rejecting: HashSet::new(),
            step_delay: Duration::from_millis(800),
        }
    }
}

impl SimulatedConnector {
    /// Connector offering [`SIMULATED_PROVIDERS`], one step per 800 ms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the offered providers.
    #[must_use]
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the delay between verification steps.
    #[must_use]
    pub const fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Makes every connection through `provider` get rejected.
    #[must_use]
    pub fn rejecting(mut self, provider: impl Into<String>) -> Self {
        self.rejecting.insert(provider.into());
        self
    }
}

#[async_trait]
impl Connector for SimulatedConnector {
    fn providers(&self) -> Vec<String> {
        self.providers.clone()
    }

    async fn connect(&self, provider_id: &str) -> Result<ConnectedAccount, ConnectError> {
        ensure_offered(self, provider_id)?;
        if self.rejecting.contains(provider_id) {
            return Err(ConnectError::ConnectionRejected {
                provider: provider_id.to_string(),
                reason: "user rejected the request".to_string(),
            });
        }
        let account = ConnectedAccount {
            provider: provider_id.to_string(),
            account: format!("0x{}", uuid::Uuid::new_v4().simple()),
        };
        info!(provider = provider_id, account = %account.account, "connected");
        Ok(account)
    }

    async fn verify(&self, account: &ConnectedAccount, steps: &StepList, completer: StepCompleter) {
        for label in steps.iter() {
            tokio::time::sleep(self.step_delay).await;
            if !completer.complete_next() {
                debug!(provider = %account.provider, "verification abandoned");
                return;
            }
            debug!(provider = %account.provider, step = label, "step verified");
        }
    }
}
