//! Server-reported vote counts for one participant in one conversation.

use serde::{Deserialize, Serialize};

/// Immutable view of the participant's statistics.
///
/// Fetched fresh before every decision and replaced, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    total_comments: u32,
    voted_comments: u32,
    missing_votes: u32,
}

impl StatisticsSnapshot {
    /// Snapshot with `missing_votes` derived from the two counters.
    pub fn new(total_comments: u32, voted_comments: u32) -> Self {
        Self {
            total_comments,
            voted_comments,
            missing_votes: total_comments.saturating_sub(voted_comments),
        }
    }

    pub fn total_comments(&self) -> u32 {
        self.total_comments
    }

    pub fn voted_comments(&self) -> u32 {
        self.voted_comments
    }

    pub fn missing_votes(&self) -> u32 {
        self.missing_votes
    }

    /// Whether at least one comment is still waiting for this participant.
    pub fn comments_remain(&self) -> bool {
        self.missing_votes >= 1
    }
}

/// Statistics as EJ serializes them. `comments` is the voted counter.
#[derive(Debug, Clone, Deserialize)]
pub struct WireStatistics {
    pub total_comments: u32,
    pub comments: u32,
    #[serde(default)]
    pub missing_votes: Option<u32>,
    #[serde(default)]
    pub votes: Option<u32>,
    #[serde(default)]
    pub participation_ratio: Option<f64>,
}

impl TryFrom<WireStatistics> for StatisticsSnapshot {
    type Error = String;

    fn try_from(wire: WireStatistics) -> Result<Self, Self::Error> {
        if wire.comments > wire.total_comments {
            return Err(format!(
                "voted comments ({}) exceed total comments ({})",
                wire.comments, wire.total_comments
            ));
        }
        let mut snapshot = Self::new(wire.total_comments, wire.comments);
        if let Some(missing) = wire.missing_votes {
            snapshot.missing_votes = missing;
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<StatisticsSnapshot, String> {
        let wire: WireStatistics = serde_json::from_str(json).unwrap();
        StatisticsSnapshot::try_from(wire)
    }

    #[test]
    fn reads_ej_payload() {
        let snapshot = parse(
            r#"{"votes": 3, "missing_votes": 7, "participation_ratio": 0.3,
                "total_comments": 10, "comments": 3}"#,
        )
        .unwrap();
        assert_eq!(snapshot.total_comments(), 10);
        assert_eq!(snapshot.voted_comments(), 3);
        assert_eq!(snapshot.missing_votes(), 7);
        assert!(snapshot.comments_remain());
    }

    #[test]
    fn derives_missing_votes_when_absent() {
        let snapshot = parse(r#"{"total_comments": 10, "comments": 10}"#).unwrap();
        assert_eq!(snapshot.missing_votes(), 0);
        assert!(!snapshot.comments_remain());
    }

    #[test]
    fn rejects_more_votes_than_comments() {
        let err = parse(r#"{"total_comments": 2, "comments": 3}"#).unwrap_err();
        assert!(err.contains("exceed"));
    }

    #[test]
    fn availability_follows_missing_votes() {
        assert!(StatisticsSnapshot::new(20, 0).comments_remain());
        assert!(StatisticsSnapshot::new(20, 19).comments_remain());
        assert!(!StatisticsSnapshot::new(20, 20).comments_remain());
    }
}
