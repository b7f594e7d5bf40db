//! Explicit pipeline state shared by the connect stages.
//!
//! Each page receives the context instead of reading ambient "is the
//! previous stage connected" flags. The context round-trips through host
//! storage as JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FlowError;
use crate::scorecard::StageScores;

use super::stage::Stage;
use super::store::KeyValueStore;

/// Storage key holding the serialized context.
pub const CONTEXT_KEY: &str = "degenscore.context";

/// Storage key remembering the account connected for `stage`.
#[must_use]
pub fn account_key(stage: Stage) -> String {
    format!("degenscore.{stage}.account")
}

/// Outcome of one connected stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Final score of the stage's sequence
    pub score: u64,
    /// When the stage reached `Done`
    pub connected_at: DateTime<Utc>,
    /// Account connected through the external connector, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// Connected stages and their scores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowContext {
    #[serde(default)]
    stages: BTreeMap<Stage, StageRecord>,
    /// Stage order of the flow that wrote this context; empty means the
    /// full default flow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    order: Vec<Stage>,
}

impl FlowContext {
    /// Empty context: nothing connected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `stage` has completed.
    #[must_use]
    pub fn is_connected(&self, stage: Stage) -> bool {
        self.stages.contains_key(&stage)
    }

    /// Final score of `stage`, if connected.
    #[must_use]
    pub fn score(&self, stage: Stage) -> Option<u64> {
        self.stages.get(&stage).map(|r| r.score)
    }

    /// Account recorded for `stage`, if any.
    #[must_use]
    pub fn account(&self, stage: Stage) -> Option<&str> {
        self.stages.get(&stage).and_then(|r| r.account.as_deref())
    }

    /// Marks `stage` connected with `score`, replacing any earlier record.
    pub fn record(&mut self, stage: Stage, score: u64, account: Option<String>) {
        self.stages.insert(
            stage,
            StageRecord {
                score,
                connected_at: Utc::now(),
                account,
            },
        );
    }

    /// Connected stages in flow order.
    pub fn connected(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages.keys().copied()
    }

    /// Whether every stage in `stages` is connected.
    #[must_use]
    pub fn all_connected(&self, stages: &[Stage]) -> bool {
        stages.iter().all(|s| self.is_connected(*s))
    }

    /// Stages of the flow this context belongs to, in order.
    #[must_use]
    pub fn order(&self) -> Vec<Stage> {
        if self.order.is_empty() {
            Stage::ALL.to_vec()
        } else {
            self.order.clone()
        }
    }

    /// Remembers the flow's stage order. Returns `true` if it changed.
    pub fn set_order(&mut self, order: &[Stage]) -> bool {
        if self.order == order {
            return false;
        }
        self.order = order.to_vec();
        true
    }

    /// First stage of the flow that is not connected yet.
    #[must_use]
    pub fn first_missing(&self) -> Option<Stage> {
        self.order().into_iter().find(|s| !self.is_connected(*s))
    }

    /// Stage scores for the scorecard; unconnected stages count as zero.
    #[must_use]
    pub fn scores(&self) -> StageScores {
        let mut scores = StageScores::default();
        for (stage, record) in &self.stages {
            scores.set(*stage, record.score);
        }
        scores
    }

    /// Loads the context from `store`. A missing entry is an empty context.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Storage` if the store fails, or
    /// `FlowError::CorruptState` if the stored JSON cannot be decoded.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, FlowError> {
        let Some(raw) = store.get(CONTEXT_KEY)? else {
            return Ok(Self::new());
        };
        let ctx: Self = serde_json::from_str(&raw).map_err(|e| FlowError::CorruptState {
            key: CONTEXT_KEY.to_string(),
            message: e.to_string(),
        })?;
        debug!(connected = ctx.stages.len(), "loaded flow context");
        Ok(ctx)
    }

    /// Writes the context to `store`.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Storage` if encoding or the store write fails.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), FlowError> {
        let raw = serde_json::to_string(self).map_err(|e| FlowError::Storage(e.to_string()))?;
        store.set(CONTEXT_KEY, &raw)
    }

    /// Removes the stored context and every remembered account from
    /// `store`. Stored values are never decoded, so a corrupt context can
    /// still be cleared.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Storage` if the store fails.
    pub fn clear(store: &dyn KeyValueStore) -> Result<(), FlowError> {
        store.remove(CONTEXT_KEY)?;
        for stage in Stage::ALL {
            store.remove(&account_key(stage))?;
        }
        Ok(())
    }
}
