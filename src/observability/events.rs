//! Observable events
//!
//! Events are explicit and typed; each maps to one stable upper-case name.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Build lifecycle
    BuildBegin,
    BuildComplete,
    BuildFailed,
    BuildIncomplete,

    // Patch replay
    PatchReplayBegin,
    PatchReplayComplete,
    PatchReplayFailed,
    PatchReplayIncomplete,

    /// A name or offset did not fit its encoding
    CapacityExceeded,
    /// A partially written database directory was removed
    DatabaseDropped,
    /// Stored checksum differs from the table on disk (FATAL)
    ChecksumMismatch,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BuildBegin => "BUILD_BEGIN",
            Event::BuildComplete => "BUILD_COMPLETE",
            Event::BuildFailed => "BUILD_FAILED",
            Event::BuildIncomplete => "BUILD_INCOMPLETE",
            Event::PatchReplayBegin => "PATCH_REPLAY_BEGIN",
            Event::PatchReplayComplete => "PATCH_REPLAY_COMPLETE",
            Event::PatchReplayFailed => "PATCH_REPLAY_FAILED",
            Event::PatchReplayIncomplete => "PATCH_REPLAY_INCOMPLETE",
            Event::CapacityExceeded => "CAPACITY_EXCEEDED",
            Event::DatabaseDropped => "DATABASE_DROPPED",
            Event::ChecksumMismatch => "CHECKSUM_MISMATCH",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::ChecksumMismatch)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work logged as begin / complete / failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Build,
    PatchReplay,
}

impl Phase {
    pub fn begin(self) -> Event {
        match self {
            Phase::Build => Event::BuildBegin,
            Phase::PatchReplay => Event::PatchReplayBegin,
        }
    }

    pub fn complete(self) -> Event {
        match self {
            Phase::Build => Event::BuildComplete,
            Phase::PatchReplay => Event::PatchReplayComplete,
        }
    }

    pub fn failed(self) -> Event {
        match self {
            Phase::Build => Event::BuildFailed,
            Phase::PatchReplay => Event::PatchReplayFailed,
        }
    }

    pub fn incomplete(self) -> Event {
        match self {
            Phase::Build => Event::BuildIncomplete,
            Phase::PatchReplay => Event::PatchReplayIncomplete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake() {
        for phase in [Phase::Build, Phase::PatchReplay] {
            for event in [phase.begin(), phase.complete(), phase.failed(), phase.incomplete()] {
                let s = event.as_str();
                assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
            }
        }
        assert_eq!(Event::CapacityExceeded.to_string(), "CAPACITY_EXCEEDED");
    }

    #[test]
    fn test_phase_event_names() {
        assert_eq!(Phase::Build.begin().as_str(), "BUILD_BEGIN");
        assert_eq!(Phase::PatchReplay.complete().as_str(), "PATCH_REPLAY_COMPLETE");
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::ChecksumMismatch.is_fatal());
        assert!(!Event::BuildFailed.is_fatal());
    }
}
