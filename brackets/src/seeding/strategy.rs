//! Seeding strategies that reorder an entrant list before bracket
//! construction.

use crate::bracket::{BracketError, BracketResult, Participant, StageId};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Named reordering applied to the entrant list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedingStrategy {
    /// Identity
    #[default]
    Natural,
    /// Input reversed
    Reverse,
    /// Second half, then first half
    HalfShift,
    /// Second half reversed, then first half reversed
    ReverseHalfShift,
    /// Swap each consecutive pair
    PairFlip,
    /// Alternate between the outer ends, starting from the left
    InnerOuter,
    /// Uniformly random permutation
    Random,
}

impl SeedingStrategy {
    /// All strategies, in declaration order
    pub const ALL: [SeedingStrategy; 7] = [
        SeedingStrategy::Natural,
        SeedingStrategy::Reverse,
        SeedingStrategy::HalfShift,
        SeedingStrategy::ReverseHalfShift,
        SeedingStrategy::PairFlip,
        SeedingStrategy::InnerOuter,
        SeedingStrategy::Random,
    ];

    /// Parse a strategy name, falling back to `Natural` for unknown names
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::debug!("Unknown seeding strategy {name:?}, using natural");
            SeedingStrategy::Natural
        })
    }

    /// Whether the output depends only on the input
    pub fn is_deterministic(self) -> bool {
        self != SeedingStrategy::Random
    }

    /// Reorder items according to the strategy
    ///
    /// Every input item appears exactly once in the output.
    pub fn apply<T>(self, mut items: Vec<T>) -> Vec<T> {
        let half = items.len() / 2;
        match self {
            SeedingStrategy::Natural => items,
            SeedingStrategy::Reverse => {
                items.reverse();
                items
            }
            SeedingStrategy::HalfShift => {
                items.rotate_left(half);
                items
            }
            SeedingStrategy::ReverseHalfShift => {
                let mut second = items.split_off(half);
                second.reverse();
                items.reverse();
                second.append(&mut items);
                second
            }
            SeedingStrategy::PairFlip => {
                for pair in items.chunks_exact_mut(2) {
                    pair.swap(0, 1);
                }
                items
            }
            SeedingStrategy::InnerOuter => {
                let mut remaining: std::collections::VecDeque<T> = items.into();
                let mut result = Vec::with_capacity(remaining.len());
                let mut take_left = true;
                loop {
                    let next = if take_left {
                        remaining.pop_front()
                    } else {
                        remaining.pop_back()
                    };
                    let Some(item) = next else { break };
                    result.push(item);
                    take_left = !take_left;
                }
                result
            }
            SeedingStrategy::Random => {
                items.shuffle(&mut rand::rng());
                items
            }
        }
    }
}

impl fmt::Display for SeedingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeedingStrategy::Natural => "natural",
            SeedingStrategy::Reverse => "reverse",
            SeedingStrategy::HalfShift => "half_shift",
            SeedingStrategy::ReverseHalfShift => "reverse_half_shift",
            SeedingStrategy::PairFlip => "pair_flip",
            SeedingStrategy::InnerOuter => "inner_outer",
            SeedingStrategy::Random => "random",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SeedingStrategy {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeedingStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.to_string() == s)
            .ok_or_else(|| BracketError::UnknownStrategy(s.to_string()))
    }
}

/// Seed a list of entrant names
///
/// Participant IDs are the entrants' indices in `names`; seeds are the
/// 1-based positions after the strategy ran.
///
/// # Errors
///
/// Returns `InsufficientParticipants` when fewer than two names are given.
pub fn seed_participants(
    stage_id: StageId,
    names: &[String],
    strategy: SeedingStrategy,
) -> BracketResult<Vec<Participant>> {
    if names.len() < 2 {
        return Err(BracketError::InsufficientParticipants(names.len()));
    }

    let indexed: Vec<(usize, &String)> = names.iter().enumerate().collect();
    let seeded = strategy
        .apply(indexed)
        .into_iter()
        .enumerate()
        .map(|(rank, (index, name))| Participant {
            id: index as i64,
            stage_id,
            name: name.clone(),
            seed: rank as u32 + 1,
        })
        .collect();

    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("P{i}")).collect()
    }

    fn apply(strategy: SeedingStrategy, n: usize) -> Vec<String> {
        strategy.apply(labels(n))
    }

    #[test]
    fn test_natural_is_identity() {
        assert_eq!(apply(SeedingStrategy::Natural, 4), labels(4));
    }

    #[test]
    fn test_reverse() {
        assert_eq!(apply(SeedingStrategy::Reverse, 3), ["P3", "P2", "P1"]);
    }

    #[test]
    fn test_half_shift_odd_count() {
        assert_eq!(
            apply(SeedingStrategy::HalfShift, 5),
            ["P3", "P4", "P5", "P1", "P2"]
        );
    }

    #[test]
    fn test_reverse_half_shift() {
        assert_eq!(
            apply(SeedingStrategy::ReverseHalfShift, 5),
            ["P5", "P4", "P3", "P2", "P1"]
        );
        assert_eq!(
            apply(SeedingStrategy::ReverseHalfShift, 4),
            ["P4", "P3", "P2", "P1"]
        );
        assert_eq!(
            apply(SeedingStrategy::ReverseHalfShift, 6),
            ["P6", "P5", "P4", "P3", "P2", "P1"]
        );
    }

    #[test]
    fn test_pair_flip_keeps_trailing_item() {
        assert_eq!(
            apply(SeedingStrategy::PairFlip, 5),
            ["P2", "P1", "P4", "P3", "P5"]
        );
    }

    #[test]
    fn test_inner_outer() {
        assert_eq!(
            apply(SeedingStrategy::InnerOuter, 6),
            ["P1", "P6", "P2", "P5", "P3", "P4"]
        );
        assert_eq!(
            apply(SeedingStrategy::InnerOuter, 5),
            ["P1", "P5", "P2", "P4", "P3"]
        );
    }

    #[test]
    fn test_empty_input() {
        for strategy in SeedingStrategy::ALL {
            assert!(strategy.apply(Vec::<u8>::new()).is_empty());
        }
    }

    #[test]
    fn test_unknown_name_falls_back_to_natural() {
        assert_eq!(
            SeedingStrategy::parse_lenient("snake"),
            SeedingStrategy::Natural
        );
        assert!("snake".parse::<SeedingStrategy>().is_err());
        assert_eq!(
            "pair_flip".parse::<SeedingStrategy>().unwrap(),
            SeedingStrategy::PairFlip
        );
    }

    #[test]
    fn test_seed_participants_assigns_ranks() {
        let seeded = seed_participants(9, &labels(3), SeedingStrategy::Reverse).unwrap();
        assert_eq!(seeded[0].name, "P3");
        assert_eq!(seeded[0].id, 2);
        assert_eq!(seeded[0].seed, 1);
        assert_eq!(seeded[2].id, 0);
        assert_eq!(seeded[2].seed, 3);
        assert!(seeded.iter().all(|p| p.stage_id == 9));
    }

    #[test]
    fn test_seed_participants_requires_two() {
        let result = seed_participants(1, &labels(1), SeedingStrategy::Natural);
        assert!(matches!(
            result,
            Err(BracketError::InsufficientParticipants(1))
        ));
    }
}
