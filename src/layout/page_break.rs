//! # Page Break Decisions
//!
//! Shared by every splittable element: given the height left on the page
//! and the heights of the indivisible units an element is made of (lines of
//! a paragraph, row blocks of a grid), decide how many units stay here.

use crate::geometry::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// Every unit fits.
    Place,
    /// Nothing should be placed on this page.
    MoveToNextPage,
    /// Place the first `items_on_current_page` units, continue with the rest.
    Split { items_on_current_page: usize },
}

/// Constraints on where a split may happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakRules {
    pub breakable: bool,
    /// Minimum units left on this page when splitting.
    pub min_orphan_lines: usize,
    /// Minimum units carried to the next page when splitting.
    pub min_widow_lines: usize,
}

impl Default for BreakRules {
    fn default() -> Self {
        Self {
            breakable: true,
            min_orphan_lines: 1,
            min_widow_lines: 1,
        }
    }
}

/// Count how many leading units fit in `remaining_height`.
pub fn fit_count(remaining_height: f64, unit_heights: &[f64]) -> usize {
    let mut running = 0.0;
    let mut count = 0;
    for &h in unit_heights {
        if running + h > remaining_height + EPSILON {
            break;
        }
        running += h;
        count += 1;
    }
    count
}

/// Given the remaining space on a page and the unit heights, decide how to break.
pub fn decide_break(remaining_height: f64, unit_heights: &[f64], rules: BreakRules) -> BreakDecision {
    let total: f64 = unit_heights.iter().sum();
    if total <= remaining_height + EPSILON {
        return BreakDecision::Place;
    }

    if !rules.breakable {
        return BreakDecision::MoveToNextPage;
    }

    let total_units = unit_heights.len();
    let fitting = fit_count(remaining_height, unit_heights);

    // Orphans: too few units would stay on this page.
    if fitting == 0 || fitting < rules.min_orphan_lines {
        return BreakDecision::MoveToNextPage;
    }

    // Widows: too few units would move on. Pull some back.
    let carried = total_units - fitting;
    if carried < rules.min_widow_lines {
        let adjusted = fitting.saturating_sub(rules.min_widow_lines - carried);
        if adjusted == 0 || adjusted < rules.min_orphan_lines {
            return BreakDecision::MoveToNextPage;
        }
        return BreakDecision::Split {
            items_on_current_page: adjusted,
        };
    }

    BreakDecision::Split {
        items_on_current_page: fitting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(orphans: usize, widows: usize) -> BreakRules {
        BreakRules {
            breakable: true,
            min_orphan_lines: orphans,
            min_widow_lines: widows,
        }
    }

    #[test]
    fn everything_fits() {
        let decision = decide_break(90.0, &[20.0, 30.0, 40.0], rules(2, 2));
        assert_eq!(decision, BreakDecision::Place);
    }

    #[test]
    fn unbreakable_moves() {
        let unbreakable = BreakRules {
            breakable: false,
            ..BreakRules::default()
        };
        let decision = decide_break(50.0, &[20.0, 30.0, 40.0], unbreakable);
        assert_eq!(decision, BreakDecision::MoveToNextPage);
    }

    #[test]
    fn split_at_right_point() {
        let decision = decide_break(55.0, &[20.0, 30.0, 40.0], BreakRules::default());
        assert_eq!(
            decision,
            BreakDecision::Split {
                items_on_current_page: 2,
            }
        );
    }

    #[test]
    fn nothing_fits() {
        let decision = decide_break(10.0, &[20.0, 30.0], BreakRules::default());
        assert_eq!(decision, BreakDecision::MoveToNextPage);
        assert_eq!(fit_count(10.0, &[20.0, 30.0]), 0);
    }

    #[test]
    fn orphan_control() {
        // Only 1 unit would fit, but at least 2 must stay.
        let decision = decide_break(25.0, &[20.0, 30.0, 40.0], rules(2, 2));
        assert_eq!(decision, BreakDecision::MoveToNextPage);
    }

    #[test]
    fn widow_control() {
        // 3 of 4 fit, leaving 1 widow (min=2): pull one back.
        let decision = decide_break(70.0, &[20.0, 20.0, 20.0, 20.0], rules(2, 2));
        assert_eq!(
            decision,
            BreakDecision::Split {
                items_on_current_page: 2,
            }
        );
    }

    #[test]
    fn exact_fit_tolerates_rounding() {
        let heights = [7.86, 12.0, 12.0, 12.0];
        assert_eq!(fit_count(31.86, &heights), 3);
    }
}
