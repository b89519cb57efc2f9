//! Player-facing hint text derived from connection progress.

use crate::catalog::Level;
use crate::progress::{ConnectionCategory, ConnectionProgress};

const ALL_CONNECTED: &str = "All connections look good! Try testing the system.";
const ALL_CONNECTED_DETAILED: &str =
    "All connections complete! The system should be ready to test.";

fn connect_advice(category: ConnectionCategory) -> &'static str {
    match category {
        ConnectionCategory::Power => "Connect equipment to power sources.",
        ConnectionCategory::Xlr => "Connect audio equipment with XLR cables.",
        ConnectionCategory::Wireless => "Pair wireless transmitters with their receivers.",
        ConnectionCategory::Ethernet => "Connect network equipment with Ethernet cables.",
        ConnectionCategory::Dmx => "Chain lighting fixtures with DMX cables.",
        ConnectionCategory::Hdmi => "Connect video sources to displays with HDMI cables.",
    }
}

fn default_solution(category: ConnectionCategory) -> &'static str {
    match category {
        ConnectionCategory::Power => {
            "Connect power distribution outputs to each device's power input."
        }
        ConnectionCategory::Xlr => {
            "Run XLR from each audio output to the next device's input, following the signal flow."
        }
        ConnectionCategory::Wireless => "Link each wireless transmitter to a receiver input.",
        ConnectionCategory::Ethernet => "Run Ethernet from the network outputs to the controllers.",
        ConnectionCategory::Dmx => "Daisy-chain DMX from the console output through each fixture.",
        ConnectionCategory::Hdmi => "Run HDMI from each video output to a display or switcher input.",
    }
}

fn plural(count: u32) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// One line per unsatisfied category followed by the level's strategy
/// line, or a single all-clear line.
#[must_use]
pub fn basic_hints(level: &Level, progress: &ConnectionProgress) -> Vec<String> {
    let missing = progress.missing();
    if missing.is_empty() {
        return vec![ALL_CONNECTED.to_string()];
    }
    let mut lines: Vec<String> = missing
        .iter()
        .map(|&(category, count)| {
            format!(
                "You need {count} more {} connection{}. {}",
                category.label(),
                plural(count),
                connect_advice(category)
            )
        })
        .collect();
    if let Some(strategy) = &level.strategy_hint {
        lines.push(format!("Strategy: {strategy}"));
    }
    lines
}

/// Detailed breakdown per unsatisfied category with a suggested solution.
/// Level-authored solution notes replace the generic suggestion.
#[must_use]
pub fn detailed_hints(level: &Level, progress: &ConnectionProgress) -> Vec<String> {
    let missing = progress.missing();
    if missing.is_empty() {
        return vec![ALL_CONNECTED_DETAILED.to_string()];
    }
    let mut lines = Vec::with_capacity(missing.len());
    for &(category, count) in &missing {
        let entry = progress.get(category);
        let solution = level
            .solution_notes
            .get(&category)
            .map_or(default_solution(category), String::as_str);
        lines.push(format!(
            "{} connections missing: {count} (required {}, current {}). Solution: {solution}",
            category.label().to_uppercase(),
            entry.required,
            entry.display_current()
        ));
    }
    lines
}
