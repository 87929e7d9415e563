/// Property-based tests for seeding, bracket construction and progression
///
/// These tests check the structural counts of every format and that playing
/// any sequence of results through a bracket always ends with a champion.
use brackets::bracket::{
    Bracket, BracketFactory, GrandFinalType, MatchStatus, MatchUpdate, StageFormat, StageSettings,
    StageStatus, report_result, reset_stage,
};
use brackets::seeding::{SeedingStrategy, seed_participants};
use proptest::prelude::*;

fn strategy_strategy() -> impl Strategy<Value = SeedingStrategy> {
    prop::sample::select(SeedingStrategy::ALL.to_vec())
}

fn names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("P{i}")).collect()
}

fn build(format: StageFormat, n: usize, settings: StageSettings) -> Bracket {
    let participants = seed_participants(1, &names(n), SeedingStrategy::Natural).unwrap();
    BracketFactory::create(1, "Prop", format, participants, settings).unwrap()
}

/// Report results until nothing is ready, picking winners from `picks`
///
/// Asserts the stage is not completed before any report.
fn play_out(mut bracket: Bracket, picks: &[bool]) -> Bracket {
    let mut step = 0;
    while let Some(id) = bracket
        .matches
        .iter()
        .find(|m| m.status == MatchStatus::Ready)
        .map(|m| m.id)
    {
        assert_ne!(bracket.stage.status, StageStatus::Completed);
        let first_wins = picks.get(step % picks.len().max(1)).copied().unwrap_or(true);
        let update = if first_wins {
            MatchUpdate::scores(1, 0)
        } else {
            MatchUpdate::scores(0, 1)
        };
        bracket = report_result(&bracket, id, &update).unwrap().bracket;
        step += 1;
        assert!(step <= bracket.matches.len(), "more reports than matches");
    }
    bracket
}

proptest! {
    #[test]
    fn test_seeding_is_a_permutation(
        items in prop::collection::vec(any::<u32>(), 0..64),
        strategy in strategy_strategy(),
    ) {
        let mut output = strategy.apply(items.clone());
        let mut input = items;
        prop_assert_eq!(output.len(), input.len());
        output.sort_unstable();
        input.sort_unstable();
        prop_assert_eq!(output, input);
    }

    #[test]
    fn test_deterministic_strategies_repeat(
        items in prop::collection::vec(any::<u16>(), 0..32),
        strategy in strategy_strategy(),
    ) {
        prop_assume!(strategy.is_deterministic());
        prop_assert_eq!(strategy.apply(items.clone()), strategy.apply(items));
    }

    #[test]
    fn test_single_elimination_counts(n in 2usize..=64) {
        let bracket = build(StageFormat::SingleElimination, n, StageSettings::default());
        let size = n.next_power_of_two();
        let byes = bracket.matches.iter().filter(|m| m.status == MatchStatus::Bye).count();
        prop_assert_eq!(bracket.matches.len(), size - 1);
        prop_assert_eq!(byes, size - n);
    }

    #[test]
    fn test_round_robin_counts(n in 2usize..=16, k in 1u32..=3) {
        let settings = StageSettings { matches_per_pair: k, ..StageSettings::default() };
        let bracket = build(StageFormat::RoundRobin, n, settings);
        prop_assert_eq!(bracket.matches.len(), k as usize * n * (n - 1) / 2);
        prop_assert!(bracket
            .matches
            .iter()
            .all(|m| m.forward_winner_to.is_none() && m.forward_loser_to.is_none()));
    }

    #[test]
    fn test_forward_edges_point_forward(n in 2usize..=40, double in any::<bool>()) {
        let format = if double {
            StageFormat::DoubleElimination
        } else {
            StageFormat::SingleElimination
        };
        let bracket = build(format, n, StageSettings::default());
        for m in &bracket.matches {
            for target in [m.forward_winner_to, m.forward_loser_to].into_iter().flatten() {
                prop_assert!(target.match_id > m.id);
            }
        }
    }

    #[test]
    fn test_playing_everything_crowns_a_champion(
        n in 2usize..=24,
        format_pick in 0usize..4,
        balance_byes in any::<bool>(),
        picks in prop::collection::vec(any::<bool>(), 1..64),
    ) {
        let (format, grand_final) = match format_pick {
            0 => (StageFormat::SingleElimination, GrandFinalType::Double),
            1 => (StageFormat::DoubleElimination, GrandFinalType::Simple),
            2 => (StageFormat::DoubleElimination, GrandFinalType::Double),
            _ => (StageFormat::RoundRobin, GrandFinalType::Double),
        };
        let settings = StageSettings {
            balance_byes,
            grand_final,
            ..StageSettings::default()
        };
        let done = play_out(build(format, n, settings), &picks);

        prop_assert_eq!(done.stage.status, StageStatus::Completed);
        prop_assert!(done.stage.winner.is_some());
        prop_assert!(done.matches.iter().all(|m| m.status.is_settled()));
    }

    #[test]
    fn test_reset_matches_fresh_build(
        n in 2usize..=16,
        double in any::<bool>(),
        picks in prop::collection::vec(any::<bool>(), 1..16),
        reports in 0usize..8,
    ) {
        let format = if double {
            StageFormat::DoubleElimination
        } else {
            StageFormat::SingleElimination
        };
        let fresh = build(format, n, StageSettings::default());

        let mut played = fresh.clone();
        for (i, &first_wins) in picks.iter().cycle().take(reports).enumerate() {
            let Some(id) = played
                .matches
                .iter()
                .find(|m| m.status == MatchStatus::Ready)
                .map(|m| m.id)
            else {
                break;
            };
            let update = if first_wins || i % 3 == 0 {
                MatchUpdate::scores(2, 1)
            } else {
                MatchUpdate::scores(1, 2)
            };
            played = report_result(&played, id, &update).unwrap().bracket;
        }

        let reset = reset_stage(&played).unwrap().bracket;
        prop_assert_eq!(&reset.matches, &fresh.matches);
        prop_assert_eq!(reset.stage.status, StageStatus::Pending);
        prop_assert!(!reset_stage(&reset).unwrap().changed);
    }
}
