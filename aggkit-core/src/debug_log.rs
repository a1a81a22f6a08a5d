//! Human-readable record of builder operations.

/// An append-only log written by a [`PipelineBuilder`](crate::PipelineBuilder)
/// when debug mode is on.
///
/// Entries never influence the pipeline. When disabled, nothing is recorded
/// and entry text is never formatted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugLog {
    enabled: bool,
    entries: Vec<String>,
}

impl DebugLog {
    /// Create a log, recording only if `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Vec::new(),
        }
    }

    /// Check if entries are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Append an entry produced by `entry`, if enabled.
    pub fn record_with<F>(&mut self, entry: F)
    where
        F: FnOnce() -> String,
    {
        if self.enabled {
            self.entries.push(entry());
        }
    }

    /// The recorded entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
