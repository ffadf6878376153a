//! Distance-to-score normalization.
//!
//! Raw distance is the canonical relevance signal (ascending = better);
//! the 0-100 score is a derived display value computed in exactly one
//! place, here, so every surface reports the same number for the same
//! distance.

/// Distances are clamped to this magnitude before the transform so the
/// exponential can never overflow.
pub(crate) const DISTANCE_CLAMP: f32 = 10.0;

/// Distance at which the score crosses 50.
pub(crate) const SCORE_MIDPOINT: f32 = 2.0;

/// Map a raw distance to a bounded 0-100 relevance score.
///
/// `score = 100 / (1 + exp(distance - 2))` over the clamped distance. A
/// non-finite distance falls back to a rank-based score, `top_k - rank`,
/// so a numeric fault degrades to coarse ordering instead of panicking.
pub fn relevance_score(raw_distance: f32, rank: usize, top_k: usize) -> f32 {
    if !raw_distance.is_finite() {
        return top_k.saturating_sub(rank) as f32;
    }
    let d = raw_distance.clamp(-DISTANCE_CLAMP, DISTANCE_CLAMP);
    100.0 / (1.0 + (d - SCORE_MIDPOINT).exp())
}
