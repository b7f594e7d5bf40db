//! Scorecard rendering and the `scorecard` command.

use std::fmt::Write as _;

use crate::cli::args::{OutputFormat, ScorecardArgs};
use crate::error::{DegenScoreError, FlowError};
use crate::flow::{FileStore, FlowContext, Stage};
use crate::scorecard::{Scorecard, podium};

/// Print the scorecard of a stored flow.
///
/// # Errors
///
/// - `FlowError::Storage` / `FlowError::CorruptState` if the store cannot
///   be read.
/// - `FlowError::Incomplete` naming the first stage of the stored flow
///   still to connect.
pub fn run(args: &ScorecardArgs) -> Result<(), DegenScoreError> {
    let store = FileStore::open(&args.store)?;
    let ctx = FlowContext::load(&store)?;
    if let Some(missing) = ctx.first_missing() {
        return Err(FlowError::Incomplete { missing }.into());
    }
    let card = Scorecard::from_scores(ctx.scores());
    print_scorecard(&card, args.format)
}

/// Writes `card` to stdout.
///
/// # Errors
///
/// Returns `DegenScoreError::Json` if JSON encoding fails.
pub fn print_scorecard(card: &Scorecard, format: OutputFormat) -> Result<(), DegenScoreError> {
    match format {
        OutputFormat::Human => print!("{}", render_human(card)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(card)?),
    }
    Ok(())
}

/// Plain-text scorecard.
#[must_use]
pub fn render_human(card: &Scorecard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Degen Score: {} / 1000  [{}]", card.total, card.badge);
    let _ = writeln!(
        out,
        "Top {}% of Degens · {} · Rank #{}",
        card.percentile, card.tier, card.rank
    );
    out.push('\n');

    let influence = [
        (Stage::Twitter, card.influence.twitter),
        (Stage::Telegram, card.influence.telegram),
        (Stage::Wallet, card.influence.wallet),
    ];
    for (stage, percent) in influence {
        let _ = writeln!(
            out,
            "  {:<9} {:>6}  ({percent}% influence)",
            stage.title(),
            card.scores.get(stage)
        );
    }
    out.push('\n');

    let _ = writeln!(out, "Achievements ({}/{})", card.unlocked_count(), card.achievements.len());
    for achievement in &card.achievements {
        let mark = if achievement.unlocked { "x" } else { " " };
        let _ = writeln!(out, "  [{mark}] {}", achievement.label);
    }
    out.push('\n');

    out.push_str("Leaderboard\n");
    for entry in podium() {
        let _ = writeln!(out, "  {}. {:<13} {}", entry.rank, entry.name, entry.score);
    }
    let _ = writeln!(out, "  {}. {:<13} {}", card.rank, "You", card.total);
    out
}
