use crate::genomics::{AlignedSequence, Base};

/// Round to `decimals` places, resolving ties to the even neighbour.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Percentage of columns holding neither a certain base nor a gap.
///
/// Returns 0 for an empty sequence. Rounded to two decimals.
pub fn ambiguity_percent(sequence: &AlignedSequence) -> f64 {
    if sequence.is_empty() {
        return 0.0;
    }
    let ambiguous = sequence
        .bases()
        .iter()
        .filter(|base| !base.is_certain() && !base.is_gap())
        .count();
    round_to(100.0 * (ambiguous as f64 / sequence.len() as f64), 2)
}

/// Percentage of pileup support that disagrees with the reference base.
///
/// An `N` reference is never scored. Otherwise no coverage scores 0, coverage
/// with no reference support scores 100, and anything else is the
/// complement of the reference fraction rounded to two decimals.
pub fn non_ref_percent(reference: Base, ref_count: u32, total: u32) -> f64 {
    if reference == Base::N {
        return 0.0;
    }
    if total == 0 {
        0.0
    } else if ref_count == 0 {
        100.0
    } else {
        round_to(100.0 - (ref_count as f64 / total as f64) * 100.0, 2)
    }
}
