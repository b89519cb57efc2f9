use avmaster_game::{ConnectionCategory, Level, LevelCatalog, LevelCategory, required_counts};
use serde::Serialize;

/// Why a required category cannot be satisfied with the level's equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedCategory {
    pub category: ConnectionCategory,
    pub required: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelAudit {
    pub level_id: String,
    pub category: LevelCategory,
    pub required_total: u32,
    pub toolbar_total: u32,
    pub blocked: Vec<BlockedCategory>,
}

impl LevelAudit {
    #[must_use]
    pub fn reachable(&self) -> bool {
        self.blocked.is_empty()
    }
}

/// Static reachability of one level: every required category needs a rule
/// whose connector types both exist somewhere in the toolbar.
#[must_use]
pub fn audit_level(level: &Level) -> LevelAudit {
    let available = level.connector_types();
    let mut blocked = Vec::new();
    let mut required_total = 0_u32;

    for (category, required) in required_counts(level) {
        if required == 0 {
            continue;
        }
        required_total = required_total.saturating_add(required);
        let rules: Vec<_> = level
            .rules
            .iter()
            .filter(|rule| rule.cable.category() == Some(category))
            .collect();
        if rules.is_empty() {
            blocked.push(BlockedCategory {
                category,
                required,
                reason: format!("no rule accepts a {} cable", category.label()),
            });
            continue;
        }
        let usable = rules
            .iter()
            .any(|rule| available.contains(&rule.from) && available.contains(&rule.to));
        if !usable {
            let missing: Vec<String> = rules
                .iter()
                .flat_map(|rule| [rule.from, rule.to])
                .filter(|kind| !available.contains(kind))
                .map(|kind| kind.to_string())
                .collect();
            blocked.push(BlockedCategory {
                category,
                required,
                reason: format!("no equipment offers {}", missing.join(" or ")),
            });
        }
    }

    LevelAudit {
        level_id: level.id.clone(),
        category: level.category,
        required_total,
        toolbar_total: level.toolbar_total(),
        blocked,
    }
}

pub fn audit_levels(catalog: &LevelCatalog, level_ids: &[String]) -> Vec<LevelAudit> {
    level_ids
        .iter()
        .filter_map(|id| catalog.get_level(id).ok())
        .map(audit_level)
        .collect()
}
