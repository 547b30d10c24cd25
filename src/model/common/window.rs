use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};

/// How long after publication a question still counts as recent.
pub fn recent_period() -> Duration {
    Duration::days(1)
}

/// The period in which a question is visible and open for voting.
///
/// Every comparison is inclusive: a question published at exactly `now` is
/// both published and votable, and one closing at exactly `now` still accepts
/// votes. Without a close time, voting never ends once published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingWindow {
    publish_at: DateTime<Utc>,
    vote_close_at: Option<DateTime<Utc>>,
}

impl VotingWindow {
    /// Create a window, rejecting a close time before the publication time.
    pub fn new(publish_at: DateTime<Utc>, vote_close_at: Option<DateTime<Utc>>) -> Result<Self> {
        if let Some(close) = vote_close_at {
            if close < publish_at {
                return Err(Error::BadRequest(format!(
                    "voting cannot close ({close}) before the question is published ({publish_at})"
                )));
            }
        }
        Ok(Self {
            publish_at,
            vote_close_at,
        })
    }

    /// Rebuild the window of a stored question, which was validated on the way in.
    pub(crate) fn from_record(
        publish_at: DateTime<Utc>,
        vote_close_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            publish_at,
            vote_close_at,
        }
    }

    pub fn publish_at(&self) -> DateTime<Utc> {
        self.publish_at
    }

    pub fn vote_close_at(&self) -> Option<DateTime<Utc>> {
        self.vote_close_at
    }

    /// Is the question visible at `now`?
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.publish_at <= now
    }

    /// Was the question published within the last day, as of `now`?
    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        now - recent_period() <= self.publish_at && self.publish_at <= now
    }

    /// Can votes be cast at `now`?
    pub fn can_vote(&self, now: DateTime<Utc>) -> bool {
        match self.vote_close_at {
            None => self.publish_at <= now,
            Some(close) => self.publish_at <= now && now <= close,
        }
    }
}
