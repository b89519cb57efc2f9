//! Directional rule evaluation for proposed connections.

use smallvec::SmallVec;

use crate::catalog::{CableSpec, CableType, ConnectionRule, ConnectorType, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMatch<'a> {
    Matched(&'a ConnectionRule),
    Unmatched,
}

impl RuleMatch<'_> {
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// First rule of `level` whose `from`, `to`, and cable all equal the
/// proposal. Rules are directional: swapping the endpoints is a different
/// proposal.
#[must_use]
pub fn evaluate(
    level: &Level,
    from: ConnectorType,
    to: ConnectorType,
    cable: CableType,
) -> RuleMatch<'_> {
    level
        .rules
        .iter()
        .find(|rule| rule.from == from && rule.to == to && rule.cable == cable)
        .map_or(RuleMatch::Unmatched, RuleMatch::Matched)
}

/// Cables that would be accepted between the two connector types.
#[must_use]
pub fn accepted_cables(
    level: &Level,
    from: ConnectorType,
    to: ConnectorType,
) -> SmallVec<[CableType; 2]> {
    let mut cables = SmallVec::new();
    for rule in &level.rules {
        if rule.from == from && rule.to == to && !cables.contains(&rule.cable) {
            cables.push(rule.cable);
        }
    }
    cables
}

/// Cable choices offered to the player: the level's manifest, one entry per
/// cable type, in manifest order.
#[must_use]
pub fn cable_choices(level: &Level) -> SmallVec<[&CableSpec; 4]> {
    let mut choices: SmallVec<[&CableSpec; 4]> = SmallVec::new();
    for spec in &level.connections {
        if !choices.iter().any(|seen| seen.cable == spec.cable) {
            choices.push(spec);
        }
    }
    choices
}
