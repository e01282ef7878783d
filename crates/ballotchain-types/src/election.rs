//! election definitions and lifecycle status.
//!
//! an election is written once when it is created. its status is never
//! stored: it is derived from the wall clock relative to the voting window,
//! except that an administrative force-close pins it to
//! [`ElectionStatus::Closed`] for good.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Address;

/// unique identifier for an election.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElectionId(pub String);

impl ElectionId {
    /// get the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// candidate identifier, unique within its election.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    /// id for the candidate declared at `index` (0-based) in an election.
    pub fn for_index(index: usize) -> Self {
        Self(format!("c{}", index + 1))
    }

    /// get the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CandidateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// lifecycle status of an election at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    /// voting window has not started yet
    Scheduled,
    /// ballots are accepted
    Open,
    /// voting window has ended or the election was force-closed
    Closed,
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElectionStatus::Scheduled => "scheduled",
            ElectionStatus::Open => "open",
            ElectionStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// a candidate standing in an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// id, unique within the election
    pub id: CandidateId,
    /// display name
    pub name: String,
    /// party affiliation (may be empty for independents)
    #[serde(default)]
    pub party: String,
    /// free-form description
    #[serde(default)]
    pub description: String,
}

/// candidate as submitted by the administrator, before an id is assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub party: String,
    #[serde(default)]
    pub description: String,
}

impl CandidateSpec {
    /// candidate with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// set the party.
    pub fn with_party(mut self, party: impl Into<String>) -> Self {
        self.party = party.into();
        self
    }

    /// set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// election definition as submitted by the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub candidates: Vec<CandidateSpec>,
}

/// a created election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    /// unique identifier
    pub id: ElectionId,

    pub title: String,

    pub description: String,

    /// first instant at which ballots are accepted
    pub start_time: DateTime<Utc>,

    /// first instant at which ballots are no longer accepted
    pub end_time: DateTime<Utc>,

    /// candidates in declaration order
    pub candidates: Vec<Candidate>,

    /// actor that created the election
    pub created_by: Address,

    pub created_at: DateTime<Utc>,

    /// set once by an administrative force-close; never cleared
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Election {
    /// status of the election at `now`.
    ///
    /// `now < start` is scheduled, `start <= now < end` is open and
    /// `now >= end` is closed. a force-closed election is closed at every
    /// instant.
    pub fn status_at(&self, now: DateTime<Utc>) -> ElectionStatus {
        if self.closed_at.is_some() || now >= self.end_time {
            ElectionStatus::Closed
        } else if now < self.start_time {
            ElectionStatus::Scheduled
        } else {
            ElectionStatus::Open
        }
    }

    /// whether an administrator closed this election explicitly.
    pub fn is_force_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// look up a candidate by id.
    pub fn candidate(&self, id: &CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| &c.id == id)
    }

    /// declaration index of a candidate.
    pub fn candidate_position(&self, id: &CandidateId) -> Option<usize> {
        self.candidates.iter().position(|c| &c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn election(start: DateTime<Utc>, end: DateTime<Utc>) -> Election {
        Election {
            id: ElectionId::from("1"),
            title: "E1".into(),
            description: String::new(),
            start_time: start,
            end_time: end,
            candidates: vec![
                Candidate {
                    id: CandidateId::for_index(0),
                    name: "X".into(),
                    party: String::new(),
                    description: String::new(),
                },
                Candidate {
                    id: CandidateId::for_index(1),
                    name: "Y".into(),
                    party: String::new(),
                    description: String::new(),
                },
            ],
            created_by: Address::new("admin").unwrap(),
            created_at: start,
            closed_at: None,
        }
    }

    #[test]
    fn test_status_boundaries() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::hours(2);
        let e = election(t0, t1);

        assert_eq!(e.status_at(t0 - Duration::seconds(1)), ElectionStatus::Scheduled);
        assert_eq!(e.status_at(t0), ElectionStatus::Open);
        assert_eq!(e.status_at(t1 - Duration::milliseconds(1)), ElectionStatus::Open);
        assert_eq!(e.status_at(t1), ElectionStatus::Closed);
        assert_eq!(e.status_at(t1 + Duration::days(365)), ElectionStatus::Closed);
    }

    #[test]
    fn test_force_close_pins_closed() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::hours(2);
        let mut e = election(t0, t1);
        e.closed_at = Some(t0 + Duration::minutes(5));

        assert!(e.is_force_closed());
        assert_eq!(e.status_at(t0 - Duration::hours(1)), ElectionStatus::Closed);
        assert_eq!(e.status_at(t0 + Duration::minutes(1)), ElectionStatus::Closed);
        assert_eq!(e.status_at(t1 + Duration::hours(1)), ElectionStatus::Closed);
    }

    #[test]
    fn test_candidate_lookup() {
        let t0 = Utc::now();
        let e = election(t0, t0 + Duration::hours(1));

        assert_eq!(e.candidate(&"c2".into()).map(|c| c.name.as_str()), Some("Y"));
        assert_eq!(e.candidate_position(&"c1".into()), Some(0));
        assert!(e.candidate(&"c3".into()).is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ElectionStatus::Open).unwrap(),
            r#""open""#
        );
        assert_eq!(ElectionStatus::Scheduled.to_string(), "scheduled");
    }
}
