use serde::{Deserialize, Serialize};

use crate::bookwash::{Axis, Level, Targets};
use crate::service::Aggression;

/// Decides the rewriter aggression for each iteration.
///
/// Targets count as strict when any of `strict_axes` has a threshold at or
/// below `strict_threshold`. Strict targets escalate one iteration sooner:
///
/// | iteration | strict | lenient |
/// |-----------|--------|---------|
/// | 1         | 1      | 1       |
/// | 2         | 2      | 1       |
/// | 3+        | 3      | 2       |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub strict_threshold: Level,
    pub strict_axes: Vec<Axis>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            strict_threshold: Level::PG,
            strict_axes: vec![Axis::Language, Axis::Sexual],
        }
    }
}

impl EscalationPolicy {
    pub fn is_strict(&self, targets: &Targets) -> bool {
        self.strict_axes
            .iter()
            .any(|axis| targets.get(*axis) <= self.strict_threshold)
    }

    /// Aggression for the 1-based `iteration`
    pub fn aggression_for(&self, iteration: u32, targets: &Targets) -> Aggression {
        let strict = self.is_strict(targets);
        match (iteration, strict) {
            (0 | 1, _) => Aggression::Light,
            (2, true) => Aggression::Moderate,
            (2, false) => Aggression::Light,
            (_, true) => Aggression::Heavy,
            (_, false) => Aggression::Moderate,
        }
    }
}
