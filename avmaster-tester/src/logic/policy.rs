use std::fmt;

use avmaster_game::{CableType, Level, cable_choices};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::planner::PlannedLink;

/// What the player actually tries for a planned link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CableChoice {
    pub cable: CableType,
    /// Drag from the input end to the output end.
    pub reversed: bool,
}

impl CableChoice {
    #[must_use]
    pub const fn intended(link: &PlannedLink) -> Self {
        Self {
            cable: link.cable,
            reversed: false,
        }
    }

    #[must_use]
    pub fn is_intended(&self, link: &PlannedLink) -> bool {
        !self.reversed && self.cable == link.cable
    }
}

/// Policy interface for automated players.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    fn choose(&mut self, level: &Level, link: &PlannedLink) -> CableChoice;
}

/// Built-in player behaviours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerStrategy {
    Perfect,
    Clumsy,
}

impl PlayerStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PlayerStrategy::Perfect => "Perfect",
            PlayerStrategy::Clumsy => "Clumsy",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64, mistake_rate: f64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            PlayerStrategy::Perfect => Box::new(PerfectPolicy),
            PlayerStrategy::Clumsy => Box::new(ClumsyPolicy::new(seed, mistake_rate)),
        }
    }
}

impl fmt::Display for PlayerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct PerfectPolicy;

impl PlayerPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "Perfect"
    }

    fn choose(&mut self, _level: &Level, link: &PlannedLink) -> CableChoice {
        CableChoice::intended(link)
    }
}

/// Picks the wrong cable, or drags the wrong way, with a fixed probability.
struct ClumsyPolicy {
    rng: ChaCha20Rng,
    mistake_rate: f64,
}

impl ClumsyPolicy {
    fn new(seed: u64, mistake_rate: f64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            mistake_rate: mistake_rate.clamp(0.0, 1.0),
        }
    }

    fn wrong_cable(&mut self, level: &Level, correct: CableType) -> Option<CableType> {
        let mut options: Vec<CableType> = cable_choices(level)
            .iter()
            .map(|spec| spec.cable)
            .filter(|cable| *cable != correct)
            .collect();
        if options.is_empty() {
            options = CableType::ALL
                .into_iter()
                .filter(|cable| *cable != correct)
                .collect();
        }
        if options.is_empty() {
            return None;
        }
        let pick = self.rng.gen_range(0..options.len());
        options.get(pick).copied()
    }
}

impl PlayerPolicy for ClumsyPolicy {
    fn name(&self) -> &'static str {
        "Clumsy"
    }

    fn choose(&mut self, level: &Level, link: &PlannedLink) -> CableChoice {
        if !self.rng.gen_bool(self.mistake_rate) {
            return CableChoice::intended(link);
        }
        if self.rng.gen_bool(0.5) {
            CableChoice {
                cable: link.cable,
                reversed: true,
            }
        } else {
            self.wrong_cable(level, link.cable)
                .map_or(CableChoice::intended(link), |cable| CableChoice {
                    cable,
                    reversed: false,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avmaster_game::{ConnectionCategory, ConnectorRef, InstanceId, catalog};

    fn link() -> PlannedLink {
        PlannedLink {
            from: ConnectorRef::new(InstanceId(1), 0),
            to: ConnectorRef::new(InstanceId(2), 0),
            cable: CableType::XlrCable,
            category: ConnectionCategory::Xlr,
        }
    }

    #[test]
    fn perfect_player_never_errs() {
        let level = catalog().get_level("audio-1").unwrap();
        let mut policy = PlayerStrategy::Perfect.create_policy(1, 1.0);
        for _ in 0..20 {
            assert!(policy.choose(level, &link()).is_intended(&link()));
        }
    }

    #[test]
    fn clumsy_player_is_deterministic_per_seed() {
        let level = catalog().get_level("audio-1").unwrap();
        let mut a = PlayerStrategy::Clumsy.create_policy(7, 0.5);
        let mut b = PlayerStrategy::Clumsy.create_policy(7, 0.5);
        let run_a: Vec<CableChoice> = (0..32).map(|_| a.choose(level, &link())).collect();
        let run_b: Vec<CableChoice> = (0..32).map(|_| b.choose(level, &link())).collect();
        assert_eq!(run_a, run_b);
        assert!(run_a.iter().any(|choice| !choice.is_intended(&link())));
    }

    #[test]
    fn certain_mistakes_are_always_wrong() {
        let level = catalog().get_level("audio-1").unwrap();
        let mut policy = PlayerStrategy::Clumsy.create_policy(3, 1.0);
        for _ in 0..20 {
            assert!(!policy.choose(level, &link()).is_intended(&link()));
        }
    }
}
