use crate::content::schema::Turn;

/// The partner line on screen and the learner line expected in reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pair {
    pub partner: Option<usize>,
    pub learner: Option<usize>,
}

/// Pair for `index`: the nearest partner turn at or before it, and the first
/// learner turn after that partner turn.
pub fn pair_at(turns: &[Turn], index: usize) -> Pair {
    let start = index.min(turns.len());
    let partner = turns[..start.saturating_add(1).min(turns.len())]
        .iter()
        .rposition(Turn::is_partner);

    let from = partner.map_or(0, |p| p + 1);
    let learner = turns
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, t)| t.is_learner())
        .map(|(i, _)| i);

    Pair { partner, learner }
}

/// Index of the next partner turn strictly after `from`, or `turns.len()`
/// when the dialog has none left.
pub fn next_partner_after(turns: &[Turn], from: usize) -> usize {
    turns
        .iter()
        .enumerate()
        .skip(from.saturating_add(1))
        .find(|(_, t)| t.is_partner())
        .map_or(turns.len(), |(i, _)| i)
}
