//! Command-line interface
//!
//! Argument definitions and command handlers for the `degenscore` binary.

pub mod args;
pub mod commands;
