//! View contexts returned to the presentation layer.
//!
//! Routes answer with these as JSON; rendering them into pages is left to
//! whatever front end consumes the API.

use chrono::{DateTime, Utc};
use rocket::request::FlashMessage;
use serde::{Deserialize, Serialize};

use crate::model::{
    db::{Choice, Question},
    mongodb::{serde_hex_id, Id},
};

/// Shown on the listing when nothing has been published yet.
pub const NO_POLLS_NOTICE: &str = "No polls are available.";

/// A question as shown in the listing, with its eligibility evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSummary {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub text: String,
    pub publish_at: DateTime<Utc>,
    pub vote_close_at: Option<DateTime<Utc>>,
    pub can_vote: bool,
    pub recently_published: bool,
}

impl QuestionSummary {
    /// Summarise a question as of `now`.
    pub fn new(question: &Question, now: DateTime<Utc>) -> Self {
        let window = question.window();
        Self {
            id: question.id,
            text: question.text.clone(),
            publish_at: question.publish_at,
            vote_close_at: question.vote_close_at,
            can_vote: window.can_vote(now),
            recently_published: window.was_published_recently(now),
        }
    }
}

/// A one-shot message carried across a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: String,
    pub message: String,
}

impl From<FlashMessage<'_>> for Notice {
    fn from(flash: FlashMessage<'_>) -> Self {
        Self {
            kind: flash.kind().to_string(),
            message: flash.message().to_string(),
        }
    }
}

/// The listing of latest published questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexView {
    pub latest_questions: Vec<QuestionSummary>,
    /// Set when there is nothing to list.
    pub notice: Option<String>,
    pub flash: Option<Notice>,
}

impl IndexView {
    pub fn new(latest_questions: Vec<QuestionSummary>) -> Self {
        let notice = latest_questions
            .is_empty()
            .then(|| NO_POLLS_NOTICE.to_string());
        Self {
            latest_questions,
            notice,
            flash: None,
        }
    }
}

/// A selectable option on the voting form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceView {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub text: String,
}

impl From<&Choice> for ChoiceView {
    fn from(choice: &Choice) -> Self {
        Self {
            id: choice.id,
            text: choice.text.clone(),
        }
    }
}

/// The voting form for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailView {
    pub question: QuestionSummary,
    pub choices: Vec<ChoiceView>,
    /// The choice the user currently has a vote on, for pre-selection.
    #[serde(with = "serde_hex_id::option")]
    pub selected: Option<Id>,
    pub error_message: Option<String>,
}

/// The tally for one choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceResult {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub text: String,
    pub votes: u64,
}

/// Vote counts for every choice of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsView {
    pub question: QuestionSummary,
    pub choices: Vec<ChoiceResult>,
    pub total_votes: u64,
}

/// The login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginView {
    /// Where to go once logged in.
    pub next: Option<String>,
    pub flash: Option<Notice>,
}
