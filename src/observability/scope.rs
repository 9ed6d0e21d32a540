//! Begin/complete logging around a phase
//!
//! - Logs the phase's BEGIN event on creation
//! - `complete` logs COMPLETE with the elapsed milliseconds
//! - `fail` logs FAILED at ERROR level
//! - Dropping an unfinished scope logs INCOMPLETE at WARN level

use std::time::Instant;

use super::events::Phase;
use super::logger::Logger;

pub struct ObservationScope {
    phase: Phase,
    fields: Vec<(&'static str, String)>,
    started: Instant,
    finished: bool,
}

impl ObservationScope {
    pub fn new(phase: Phase) -> Self {
        Self::with_fields(phase, Vec::new())
    }

    /// `fields` are repeated on every event the scope logs.
    pub fn with_fields(phase: Phase, fields: Vec<(&'static str, String)>) -> Self {
        let scope = Self {
            phase,
            fields,
            started: Instant::now(),
            finished: false,
        };
        Logger::info(phase.begin().as_str(), &scope.field_refs(&[]));
        scope
    }

    fn field_refs<'a>(&'a self, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        self.fields
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .chain(extra.iter().copied())
            .collect()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        let elapsed = self.elapsed_ms().to_string();
        let mut fields = self.field_refs(extra);
        fields.push(("elapsed_ms", elapsed.as_str()));
        Logger::info(self.phase.complete().as_str(), &fields);
    }

    pub fn fail(mut self, reason: &str) {
        self.finished = true;
        Logger::error(self.phase.failed().as_str(), &self.field_refs(&[("reason", reason)]));
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            Logger::warn(
                self.phase.incomplete().as_str(),
                &self.field_refs(&[("reason", "scope dropped without completion")]),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_complete_marks_finished() {
        let scope = ObservationScope::with_fields(Phase::Build, vec![("db", "t".to_string())]);
        assert!(!scope.is_finished());
        scope.complete_with_fields(&[("nodes", "3")]);
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::new(Phase::PatchReplay);
        scope.fail("disk gone");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new(Phase::Build);
        drop(scope);
    }
}
