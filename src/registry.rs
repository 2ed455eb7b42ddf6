//! Rendered Build Registry.
//!
//! Stream name -> references intentionally left out of the combined
//! artifact (`--ignore-build` entries and URLs without `--force`), in
//! declaration order. Owned by the orchestrator and rebuilt from empty on
//! every run; read by the templating layer to emit direct tags.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RenderedRegistry {
    streams: BTreeMap<String, Vec<String>>,
}

impl RenderedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }

    /// Set the references of `stream`, replacing earlier ones.
    pub fn record(&mut self, stream: impl Into<String>, refs: Vec<String>) {
        self.streams.insert(stream.into(), refs);
    }

    pub fn get(&self, stream: &str) -> &[String] {
        self.streams.get(stream).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.streams
            .iter()
            .map(|(name, refs)| (name.as_str(), refs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
