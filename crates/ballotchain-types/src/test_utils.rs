//! test utilities for creating election fixtures.
//!
//! this module provides builder patterns for creating test instances
//! of ballotchain types without needing to specify all fields.

use chrono::{DateTime, Duration, Utc};

use crate::{CandidateSpec, ElectionSpec};

/// builder for creating test [`ElectionSpec`] instances.
///
/// by default the election opened an hour ago and closes in an hour, with
/// candidates `X` and `Y`.
///
/// # example
/// ```
/// use ballotchain_types::test_utils::TestElectionBuilder;
///
/// let spec = TestElectionBuilder::new("E1").build();
/// assert_eq!(spec.candidates.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct TestElectionBuilder {
    title: String,
    description: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    candidates: Vec<CandidateSpec>,
}

impl TestElectionBuilder {
    /// create a new builder with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            description: String::new(),
            start_time: now - Duration::hours(1),
            end_time: now + Duration::hours(1),
            candidates: vec![CandidateSpec::new("X"), CandidateSpec::new("Y")],
        }
    }

    /// set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// set the voting window.
    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// replace the candidate list with plain names.
    pub fn with_candidates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = names.into_iter().map(CandidateSpec::new).collect();
        self
    }

    /// replace the candidate list with full specs.
    pub fn with_candidate_specs(mut self, candidates: Vec<CandidateSpec>) -> Self {
        self.candidates = candidates;
        self
    }

    /// build the [`ElectionSpec`].
    pub fn build(self) -> ElectionSpec {
        ElectionSpec {
            title: self.title,
            description: self.description,
            start_time: self.start_time,
            end_time: self.end_time,
            candidates: self.candidates,
        }
    }
}
