use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::db::{NewChoice, NewQuestion, Question};

/// A question with its choices, as found in a seed fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSpec {
    /// Question text.
    pub text: String,
    /// Publication time.
    pub publish_at: DateTime<Utc>,
    /// End of voting, if any.
    #[serde(default)]
    pub vote_close_at: Option<DateTime<Utc>>,
    /// Possible answers, in display order.
    pub choices: Vec<String>,
}

impl QuestionSpec {
    /// Validate the window and split into the question and its choices.
    pub fn into_records(self) -> Result<(Question, Vec<NewChoice>)> {
        let question = Question::new(NewQuestion::new(
            self.text,
            self.publish_at,
            self.vote_close_at,
        )?);
        let choices = self
            .choices
            .into_iter()
            .map(|text| NewChoice {
                question_id: question.id,
                text,
            })
            .collect();
        Ok((question, choices))
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::Duration;

    impl QuestionSpec {
        /// Published `days` from now (negative for the past), never closing.
        pub fn published(text: &str, days: i64) -> Self {
            Self {
                text: text.to_string(),
                publish_at: Utc::now() + Duration::days(days),
                vote_close_at: None,
                choices: vec!["Yes".to_string(), "No".to_string()],
            }
        }

        pub fn current_example() -> Self {
            Self {
                text: "Who should be captain of the Quidditch team?".to_string(),
                publish_at: Utc::now() - Duration::days(15),
                vote_close_at: Some(Utc::now() + Duration::days(30)),
                choices: vec!["Chris Riches".to_string(), "Parry Hotter".to_string()],
            }
        }

        pub fn future_example() -> Self {
            Self {
                text: "Should CompSoc host a talk about Quantum Cryptography?".to_string(),
                publish_at: Utc::now() + Duration::days(30),
                vote_close_at: None,
                choices: vec!["Yes".to_string(), "No".to_string()],
            }
        }

        pub fn closed_example() -> Self {
            Self {
                text: "Who should be president of Warwick Extreme Moongolf?".to_string(),
                publish_at: Utc::now() - Duration::days(30),
                vote_close_at: Some(Utc::now() - Duration::days(15)),
                choices: vec!["John Smith".to_string(), "Jane Doe".to_string()],
            }
        }
    }
}
