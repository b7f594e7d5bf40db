//! `degenscore` - staged verification and score-reveal sequencer
//!
//! This library drives the "connect Twitter, Telegram and a wallet, then
//! reveal the scorecard" flow: a cancellable timer-driven sequencer per
//! stage, explicit flow state with prerequisite gating, and the derived
//! scorecard lookups.

pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod observability;
pub mod scorecard;
pub mod sequencer;
