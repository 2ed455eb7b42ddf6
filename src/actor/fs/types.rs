use std::path::PathBuf;

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }

    /// Created or removed sources change the staged layout.
    pub(super) const fn changes_layout(self) -> bool {
        matches!(self, Self::Created | Self::Removed)
    }
}

/// Debounced changes that survived classification, sorted by path.
#[derive(Debug)]
pub(super) struct DebouncedEvents(pub(super) Vec<(PathBuf, ChangeKind)>);
