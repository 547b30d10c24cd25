use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::VotingWindow,
    mongodb::{serde_optional_datetime, Id},
};

/// Core question data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCore {
    /// The prompt shown to voters.
    pub text: String,
    /// When the question becomes visible and votable.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub publish_at: DateTime<Utc>,
    /// When voting ends, if ever.
    #[serde(default, with = "serde_optional_datetime")]
    pub vote_close_at: Option<DateTime<Utc>>,
}

impl QuestionCore {
    /// Create a question, checking that voting does not close before publication.
    pub fn new(
        text: impl Into<String>,
        publish_at: DateTime<Utc>,
        vote_close_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let window = VotingWindow::new(publish_at, vote_close_at)?;
        Ok(Self {
            text: text.into(),
            publish_at: window.publish_at(),
            vote_close_at: window.vote_close_at(),
        })
    }

    /// The publication and voting window of this question.
    pub fn window(&self) -> VotingWindow {
        VotingWindow::from_record(self.publish_at, self.vote_close_at)
    }
}

/// A question without an ID.
pub type NewQuestion = QuestionCore;

/// A question from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub question: QuestionCore,
}

impl Question {
    /// Assign a fresh ID to a new question.
    pub fn new(question: NewQuestion) -> Self {
        Self {
            id: Id::new(),
            question,
        }
    }
}

impl Deref for Question {
    type Target = QuestionCore;

    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

impl DerefMut for Question {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.question
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use mongodb::bson;

    use crate::error::Error;

    #[test]
    fn close_before_publish_is_rejected() {
        let now = Utc::now();
        let result = QuestionCore::new("Backwards?", now, Some(now - Duration::days(1)));
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn bson_round_trip_keeps_window() {
        // BSON datetimes only have millisecond precision.
        let now = Utc
            .timestamp_millis_opt(Utc::now().timestamp_millis())
            .unwrap();
        let open = Question::new(QuestionCore::new("Open?", now, None).unwrap());
        let closing = Question::new(
            QuestionCore::new("Closing?", now, Some(now + Duration::days(2))).unwrap(),
        );

        for question in [open, closing] {
            let document = bson::to_document(&question).unwrap();
            assert!(document.get_datetime("publish_at").is_ok());
            let back: Question = bson::from_document(document).unwrap();
            assert_eq!(back, question);
            assert_eq!(back.window(), question.window());
        }
    }
}
