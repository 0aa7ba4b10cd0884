//! Scope of a stage execution or invalidation.
//!
//! Systems are named by their 1-based rank and parts by `(system, part)`
//! ranks, so a scope stays meaningful across rebuilds that allocate new node
//! ids.

use super::step::ScopePolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Sheet,
    Systems(BTreeSet<usize>),
    Parts(BTreeSet<(usize, usize)>),
}

impl Scope {
    pub fn systems(ranks: impl IntoIterator<Item = usize>) -> Scope {
        Scope::Systems(ranks.into_iter().collect())
    }

    pub fn parts(ranks: impl IntoIterator<Item = (usize, usize)>) -> Scope {
        Scope::Parts(ranks.into_iter().collect())
    }

    /// Systems named by the scope; `None` for the whole sheet.
    pub fn system_ranks(&self) -> Option<BTreeSet<usize>> {
        match self {
            Scope::Sheet => None,
            Scope::Systems(s) => Some(s.clone()),
            Scope::Parts(p) => Some(p.iter().map(|(s, _)| *s).collect()),
        }
    }

    pub fn covers_system(&self, system: usize) -> bool {
        match self {
            Scope::Sheet => true,
            Scope::Systems(s) => s.contains(&system),
            Scope::Parts(p) => p.iter().any(|(s, _)| *s == system),
        }
    }

    pub fn covers_part(&self, system: usize, part: usize) -> bool {
        match self {
            Scope::Parts(p) => p.contains(&(system, part)),
            other => other.covers_system(system),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Scope::Sheet => false,
            Scope::Systems(s) => s.is_empty(),
            Scope::Parts(p) => p.is_empty(),
        }
    }

    /// Smallest scope covering both. Mixed granularities widen to systems.
    pub fn merge(self, other: Scope) -> Scope {
        match (self, other) {
            (Scope::Sheet, _) | (_, Scope::Sheet) => Scope::Sheet,
            (Scope::Parts(mut a), Scope::Parts(b)) => {
                a.extend(b);
                Scope::Parts(a)
            }
            (a, b) => {
                let mut ranks = a.system_ranks().unwrap_or_default();
                ranks.extend(b.system_ranks().unwrap_or_default());
                Scope::Systems(ranks)
            }
        }
    }

    /// Widen the scope to what a stage with `policy` can honor.
    pub fn escalate(self, policy: ScopePolicy) -> Scope {
        match (policy, self) {
            (ScopePolicy::Sheet, _) => Scope::Sheet,
            (ScopePolicy::Systems, Scope::Parts(p)) => {
                Scope::Systems(p.into_iter().map(|(s, _)| s).collect())
            }
            (_, scope) => scope,
        }
    }

    /// Part of the scope lying in the given systems.
    pub fn restrict(&self, systems: &BTreeSet<usize>) -> Scope {
        match self {
            Scope::Sheet => Scope::Systems(systems.clone()),
            Scope::Systems(s) => Scope::Systems(s.intersection(systems).copied().collect()),
            Scope::Parts(p) => Scope::Parts(
                p.iter()
                    .filter(|(s, _)| systems.contains(s))
                    .copied()
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Sheet => f.write_str("sheet"),
            Scope::Systems(s) => {
                let names: Vec<String> = s.iter().map(|r| format!("S{r}")).collect();
                write!(f, "systems [{}]", names.join(","))
            }
            Scope::Parts(p) => {
                let names: Vec<String> = p.iter().map(|(s, r)| format!("S{s}P{r}")).collect();
                write!(f, "parts [{}]", names.join(","))
            }
        }
    }
}
