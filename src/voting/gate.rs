use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    api::views::{ChoiceResult, ChoiceView, DetailView, QuestionSummary, ResultsView},
    db::Question,
    mongodb::Id,
};
use crate::store::Store;

use super::VoteError;

/// Whether a view may be shown, or where the user goes instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate<T> {
    Allowed(T),
    /// Back to the listing, with this message flashed as an error.
    Redirect(String),
}

impl<T> Gate<T> {
    fn refuse(reason: VoteError) -> Self {
        debug!("View refused: {reason}");
        Self::Redirect(reason.to_string())
    }
}

/// Decide whether the voting form for a question can be shown to a user.
///
/// The user must already be authenticated; the route guard sends everyone
/// else to the login page before this is reached.
pub async fn gate_detail(
    store: &dyn Store,
    user_id: Id,
    question_id: Id,
    now: DateTime<Utc>,
) -> Result<Gate<DetailView>> {
    let question = match store.question(question_id).await? {
        Some(question) => question,
        None => return Ok(Gate::refuse(VoteError::NotFound(question_id))),
    };
    if !question.window().can_vote(now) {
        return Ok(Gate::refuse(VoteError::VotingClosed));
    }
    let view = detail_view(store, user_id, &question, now, None).await?;
    Ok(Gate::Allowed(view))
}

/// Build the voting form, pre-selecting the user's current vote.
pub async fn detail_view(
    store: &dyn Store,
    user_id: Id,
    question: &Question,
    now: DateTime<Utc>,
    error_message: Option<String>,
) -> Result<DetailView> {
    let choices = store.choices(question.id).await?;
    let selected = store
        .vote(user_id, question.id)
        .await?
        .map(|vote| vote.choice_id);
    Ok(DetailView {
        question: QuestionSummary::new(question, now),
        choices: choices.iter().map(ChoiceView::from).collect(),
        selected,
        error_message,
    })
}

/// Tally the votes on a question. Results stay visible whether or not the
/// question is currently open.
pub async fn gate_results(
    store: &dyn Store,
    question_id: Id,
    now: DateTime<Utc>,
) -> Result<Gate<ResultsView>> {
    let question = match store.question(question_id).await? {
        Some(question) => question,
        None => return Ok(Gate::refuse(VoteError::NotFound(question_id))),
    };

    let mut choices = Vec::new();
    for choice in store.choices(question.id).await? {
        let votes = store.vote_count(choice.id).await?;
        choices.push(ChoiceResult {
            id: choice.id,
            text: choice.text.clone(),
            votes,
        });
    }
    let total_votes = choices.iter().map(|choice| choice.votes).sum();

    Ok(Gate::Allowed(ResultsView {
        question: QuestionSummary::new(&question, now),
        choices,
        total_votes,
    }))
}
