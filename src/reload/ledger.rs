//! Contribution ledger.
//!
//! Records where every rendered file sits inside a combined artifact, so an
//! incremental patch replaces exactly that file's bytes even when two files
//! render to identical text.

use std::path::Path;

use crate::asset::OutputKind;
use crate::stream::Contribution;

/// How a splice located the bytes it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splice {
    /// The recorded byte range held the previous content
    ByRange,
    /// The range was stale; the previous content occurred exactly once
    BySubstring,
    /// No contribution recorded for the file
    Untracked,
    /// Neither the range nor a unique occurrence matched
    Drifted,
}

impl Splice {
    pub const fn applied(self) -> bool {
        matches!(self, Self::ByRange | Self::BySubstring)
    }
}

/// Ordered contributions of one stream's artifact.
#[derive(Debug, Clone)]
pub struct ArtifactLedger {
    pub kind: OutputKind,
    contributions: Vec<Contribution>,
}

impl ArtifactLedger {
    pub fn new(kind: OutputKind, contributions: Vec<Contribution>) -> Self {
        Self {
            kind,
            contributions,
        }
    }

    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    /// First contribution recorded under any of `paths`.
    pub fn position(&self, paths: &[&Path]) -> Option<usize> {
        paths
            .iter()
            .find_map(|p| self.contributions.iter().position(|c| c.path == *p))
    }

    /// Replace contribution `index` (previously `old`) with `new` in `artifact`.
    ///
    /// Later contributions shift by the length difference.
    pub fn splice(&mut self, artifact: &mut String, index: usize, old: &str, new: &str) -> Splice {
        let Some(current) = self.contributions.get(index) else {
            return Splice::Untracked;
        };

        let (start, how) = if artifact.get(current.range()) == Some(old) {
            (current.start, Splice::ByRange)
        } else {
            match unique_position(artifact, old) {
                Some(pos) => (pos, Splice::BySubstring),
                None => return Splice::Drifted,
            }
        };

        artifact.replace_range(start..start + old.len(), new);

        for (i, c) in self.contributions.iter_mut().enumerate() {
            if i == index {
                c.start = start;
                c.len = new.len();
            } else if c.start > start {
                c.start = (c.start + new.len()).saturating_sub(old.len());
            }
        }
        how
    }
}

fn unique_position(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut found = haystack.match_indices(needle).map(|(i, _)| i);
    match (found.next(), found.next()) {
        (Some(pos), None) => Some(pos),
        _ => None,
    }
}
