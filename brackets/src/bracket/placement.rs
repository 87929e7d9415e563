//! Seed-to-slot placement for elimination brackets.

use super::models::{ParticipantId, Slot};

/// Smallest power of two that fits `participants` (never below 2)
pub fn bracket_size(participants: usize) -> usize {
    participants.next_power_of_two().max(2)
}

/// Seeds (1-based) in bracket slot order for a bracket of `size` slots
///
/// Built by repeatedly doubling `[1, 2]`: every seed `s` is followed by its
/// mirror `2 * len + 1 - s`, so seeds 1 and 2 sit in opposite halves and the
/// top seeds face the lowest ones in the first round.
///
/// `size` must be a power of two.
pub fn seed_positions(size: usize) -> Vec<usize> {
    let mut positions = vec![1];
    while positions.len() < size {
        let mirror = positions.len() * 2 + 1;
        positions = positions.iter().flat_map(|&s| [s, mirror - s]).collect();
    }
    positions
}

/// Place seeded participants into bracket slots
///
/// With `balance_byes` the byes take the places of the missing seeds, which
/// pairs them with the highest seeds. Without it the last slots stay empty
/// and participants fill the others in placement order.
pub fn place_participants(seeded: &[ParticipantId], size: usize, balance_byes: bool) -> Vec<Slot> {
    let positions = seed_positions(size);
    let count = seeded.len().min(size);

    if balance_byes {
        return positions
            .iter()
            .map(|&seed| {
                seeded
                    .get(seed - 1)
                    .map_or(Slot::Empty, |&id| Slot::Participant(id))
            })
            .collect();
    }

    let mut slots = vec![Slot::Empty; size];
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by_key(|&slot| positions[slot]);
    for (rank, slot) in order.into_iter().enumerate() {
        slots[slot] = Slot::Participant(seeded[rank]);
    }
    slots
}
