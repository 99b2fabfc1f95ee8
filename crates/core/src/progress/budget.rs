/// A stage's slice of the overall 0-100 progress range.
///
/// Budgets are fixed up front so percentages from different stages can
/// never collide or regress; a stage reports fractions of its own window
/// and the windows sit end to end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageBudget {
    start: f64,
    end: f64,
}

impl StageBudget {
    pub const INIT: StageBudget = StageBudget::new(0.0, 5.0);
    pub const TEXT: StageBudget = StageBudget::new(5.0, 30.0);
    pub const AUDIO: StageBudget = StageBudget::new(30.0, 50.0);
    pub const RENDER: StageBudget = StageBudget::new(50.0, 62.0);
    pub const VIDEO: StageBudget = StageBudget::new(62.0, 75.0);
    pub const PUBLISH: StageBudget = StageBudget::new(75.0, 85.0);
    pub const ASSESSMENT: StageBudget = StageBudget::new(85.0, 92.0);
    pub const EMBEDDINGS: StageBudget = StageBudget::new(92.0, 99.0);

    pub const COMPLETE: f64 = 100.0;

    /// Sentinel carried by the terminal failure event.
    pub const FAILURE_SENTINEL: f64 = -1.0;

    const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Percentage after finishing `done` of `total` units in this stage.
    /// Clamped to the window, so a stage can never report outside it.
    pub fn at(&self, done: usize, total: usize) -> f64 {
        if total == 0 {
            return self.end;
        }
        let fraction = (done as f64 / total as f64).clamp(0.0, 1.0);
        self.start + (self.end - self.start) * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_are_contiguous() {
        let order = [
            StageBudget::INIT,
            StageBudget::TEXT,
            StageBudget::AUDIO,
            StageBudget::RENDER,
            StageBudget::VIDEO,
            StageBudget::PUBLISH,
            StageBudget::ASSESSMENT,
            StageBudget::EMBEDDINGS,
        ];
        for pair in order.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
        assert_eq!(order[0].start(), 0.0);
        assert!(order[order.len() - 1].end() < StageBudget::COMPLETE);
    }

    #[test]
    fn test_at_scales_within_window() {
        let budget = StageBudget::TEXT;
        assert_eq!(budget.at(0, 4), 5.0);
        assert_eq!(budget.at(2, 4), 17.5);
        assert_eq!(budget.at(4, 4), 30.0);
    }

    #[test]
    fn test_at_clamps() {
        let budget = StageBudget::AUDIO;
        assert_eq!(budget.at(10, 4), 50.0);
        assert_eq!(budget.at(0, 0), 50.0);
    }

    #[test]
    fn test_progress_is_monotonic_across_stages() {
        let mut last = 0.0;
        for (budget, total) in [
            (StageBudget::TEXT, 3),
            (StageBudget::AUDIO, 3),
            (StageBudget::RENDER, 3),
            (StageBudget::VIDEO, 3),
        ] {
            for done in 0..=total {
                let pct = budget.at(done, total);
                assert!(pct >= last, "{pct} went backwards from {last}");
                last = pct;
            }
        }
    }
}
