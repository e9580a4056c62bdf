use crate::models::{Interaction, InteractionState, Signal};

/// Decide whether a new signal completes a mutual match.
///
/// A match happens iff the new signal is a like and the reverse row is still a
/// plain `Liked`. Matched or unmatched reverse rows never re-match. Pure function of the two rows; callers must evaluate it
/// inside the same unit of work that writes the result.
#[inline]
pub fn is_mutual(signal: Signal, reverse: Option<&Interaction>) -> bool {
    signal.is_like() && reverse.map_or(false, Interaction::awaiting_match)
}

/// State the new (actor, target) row is written with
#[inline]
pub fn initial_state(signal: Signal, mutual: bool) -> InteractionState {
    match (signal, mutual) {
        (Signal::Like, true) => InteractionState::Matched,
        (Signal::Like, false) => InteractionState::Liked,
        (Signal::Dislike, _) => InteractionState::Disliked,
    }
}

/// Symmetric match fact for a pair, given both directional rows
#[inline]
pub fn pair_matched(forward: Option<&Interaction>, reverse: Option<&Interaction>) -> bool {
    forward.map_or(false, Interaction::matched) || reverse.map_or(false, Interaction::matched)
}
