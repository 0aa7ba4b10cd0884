//! Stage identifiers, the prerequisite graph and per-stage state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named unit of pipeline work.
///
/// Variants are declared in a topological order of the prerequisite graph,
/// which is also the deterministic execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepId {
    Load,
    Grid,
    Bars,
    Shapes,
    Systems,
    Measures,
    Symbols,
    Layout,
}

/// Finest scope a stage can honor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopePolicy {
    Sheet,
    Systems,
    Parts,
}

impl StepId {
    pub const ALL: [StepId; 8] = [
        StepId::Load,
        StepId::Grid,
        StepId::Bars,
        StepId::Shapes,
        StepId::Systems,
        StepId::Measures,
        StepId::Symbols,
        StepId::Layout,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            StepId::Load => "LOAD",
            StepId::Grid => "GRID",
            StepId::Bars => "BARS",
            StepId::Shapes => "SHAPES",
            StepId::Systems => "SYSTEMS",
            StepId::Measures => "MEASURES",
            StepId::Symbols => "SYMBOLS",
            StepId::Layout => "LAYOUT",
        }
    }

    /// Stages that must be done before this one may start.
    pub const fn prerequisites(self) -> &'static [StepId] {
        match self {
            StepId::Load => &[],
            StepId::Grid => &[StepId::Load],
            StepId::Bars => &[StepId::Grid],
            StepId::Shapes => &[StepId::Grid],
            StepId::Systems => &[StepId::Grid, StepId::Bars],
            StepId::Measures => &[StepId::Systems],
            StepId::Symbols => &[StepId::Measures, StepId::Shapes],
            StepId::Layout => &[StepId::Measures],
        }
    }

    pub const fn scope_policy(self) -> ScopePolicy {
        match self {
            StepId::Measures => ScopePolicy::Systems,
            StepId::Symbols => ScopePolicy::Parts,
            _ => ScopePolicy::Sheet,
        }
    }

    /// Stages that transitively depend on this one, in execution order.
    pub fn dependents(self) -> Vec<StepId> {
        let mut found: Vec<StepId> = Vec::new();
        for step in StepId::ALL {
            let hit = step
                .prerequisites()
                .iter()
                .any(|p| *p == self || found.contains(p));
            if hit {
                found.push(step);
            }
        }
        found
    }

    /// Whether `other` is a transitive prerequisite of this stage.
    pub fn depends_on(self, other: StepId) -> bool {
        other.dependents().contains(&self)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-stage, per-sheet state machine.
///
/// `Pending -> Running -> Done` or `Running -> Failed`; invalidation moves any
/// state back to `Pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    Pending,
    Running,
    Done,
    Failed,
}
