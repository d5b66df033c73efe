//! # Space Distribution
//!
//! Helpers for handing out leftover space: weighted shares for star tracks
//! and fill children, even shares for spanning-child deficits.

/// Grow items by their share of `remaining`, proportional to weight.
pub fn distribute_grow(items: &mut [(f64, f64)], remaining: f64) {
    // items: [(current_size, weight)]
    let total_weight: f64 = items.iter().map(|(_, w)| w.max(0.0)).sum();
    if total_weight <= 0.0 || remaining <= 0.0 || !remaining.is_finite() {
        return;
    }
    for (size, weight) in items.iter_mut() {
        *size += remaining * (weight.max(0.0) / total_weight);
    }
}

/// Add `amount / indices.len()` to each listed size.
pub fn distribute_evenly(sizes: &mut [f64], indices: &[usize], amount: f64) {
    if indices.is_empty() || amount <= 0.0 {
        return;
    }
    let share = amount / indices.len() as f64;
    for &i in indices {
        if let Some(size) = sizes.get_mut(i) {
            *size += share;
        }
    }
}
