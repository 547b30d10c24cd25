//! The vote service: listing, casting votes and deciding which views a user
//! may see.
//!
//! Every function takes the current time and the acting user explicitly, so
//! that routes and tests decide what "now" is.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::Error;
use crate::model::{
    api::views::{IndexView, QuestionSummary},
    db::Question,
    mongodb::Id,
};
use crate::store::{Store, VoteOutcome};

mod gate;

pub use gate::{detail_view, gate_detail, gate_results, Gate};

/// How many questions the listing shows.
pub const LATEST_QUESTIONS: usize = 5;

/// Why a vote was not recorded or a view not shown.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Poll {0} was not found")]
    NotFound(Id),
    #[error("You didn't select a choice")]
    NoSelection,
    #[error("This poll is not open for voting")]
    VotingClosed,
    #[error("Please log in to vote")]
    Unauthenticated,
    #[error(transparent)]
    Store(#[from] Error),
}

/// The latest published questions as of `now`.
pub async fn listing(store: &dyn Store, now: DateTime<Utc>) -> Result<IndexView, Error> {
    let questions = store
        .published_questions(now, LATEST_QUESTIONS)
        .await?
        .iter()
        .map(|question| QuestionSummary::new(question, now))
        .collect();
    Ok(IndexView::new(questions))
}

/// Look up a question, failing with [`VoteError::NotFound`].
pub async fn find_question(store: &dyn Store, question_id: Id) -> Result<Question, VoteError> {
    store
        .question(question_id)
        .await?
        .ok_or(VoteError::NotFound(question_id))
}

/// Record the user's vote for `choice` on a question.
///
/// `choice` is the raw form value. A question that is not open is reported
/// before the choice is looked at. A missing, malformed or foreign choice is
/// [`VoteError::NoSelection`] and writes nothing.
pub async fn cast_vote(
    store: &dyn Store,
    user_id: Id,
    question_id: Id,
    choice: Option<&str>,
    now: DateTime<Utc>,
) -> Result<VoteOutcome, VoteError> {
    let question = find_question(store, question_id).await?;
    if !question.window().can_vote(now) {
        return Err(VoteError::VotingClosed);
    }

    let choice_id = match choice.map(str::parse::<Id>) {
        Some(Ok(id)) => id,
        Some(Err(err)) => {
            debug!("Unparseable choice on question {question_id}: {err}");
            return Err(VoteError::NoSelection);
        }
        None => return Err(VoteError::NoSelection),
    };
    let choice = store
        .choice(question.id, choice_id)
        .await?
        .ok_or(VoteError::NoSelection)?;

    let outcome = store.find_or_create_vote(user_id, &choice).await?;
    match outcome {
        VoteOutcome::Created => {
            info!("User {user_id} voted for {choice_id} on question {question_id}")
        }
        VoteOutcome::Changed { previous } => {
            info!("User {user_id} changed vote from {previous} to {choice_id} on question {question_id}")
        }
        VoteOutcome::Unchanged => {
            debug!("User {user_id} repeated vote for {choice_id} on question {question_id}")
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::model::{api::question::QuestionSpec, api::views::NO_POLLS_NOTICE};
    use crate::store::Records;

    #[rocket::async_test]
    async fn empty_listing() {
        let store = Records::memory();
        let view = listing(&*store, Utc::now()).await.unwrap();
        assert!(view.latest_questions.is_empty());
        assert_eq!(view.notice.as_deref(), Some(NO_POLLS_NOTICE));
    }

    #[rocket::async_test]
    async fn listing_hides_future_questions() {
        let store = Records::memory();
        let (past, _) = store.insert_example(QuestionSpec::published("Past question.", -30)).await;
        store.insert_example(QuestionSpec::published("Future question.", 30)).await;

        let view = listing(&*store, Utc::now()).await.unwrap();
        assert_eq!(view.notice, None);
        let ids = view.latest_questions.iter().map(|q| q.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![past.id]);
    }

    #[rocket::async_test]
    async fn listing_is_capped() {
        let store = Records::memory();
        for days in 1..=LATEST_QUESTIONS as i64 + 2 {
            store.insert_example(QuestionSpec::published("Q", -days)).await;
        }
        let view = listing(&*store, Utc::now()).await.unwrap();
        assert_eq!(view.latest_questions.len(), LATEST_QUESTIONS);
    }

    #[rocket::async_test]
    async fn vote_then_revote() {
        let store = Records::memory();
        let (question, choices) = store.insert_example(QuestionSpec::current_example()).await;
        let user = Id::new();
        let now = Utc::now();

        let first = choices[0].id.to_string();
        let second = choices[1].id.to_string();
        let outcome = cast_vote(&*store, user, question.id, Some(&first), now).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Created);
        let outcome = cast_vote(&*store, user, question.id, Some(&second), now).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Changed { previous: choices[0].id });

        let vote = store.vote(user, question.id).await.unwrap().unwrap();
        assert_eq!(vote.choice_id, choices[1].id);
        assert_eq!(store.vote_count(choices[0].id).await.unwrap(), 0);
        assert_eq!(store.vote_count(choices[1].id).await.unwrap(), 1);
    }

    #[rocket::async_test]
    async fn unknown_choice_writes_nothing() {
        let store = Records::memory();
        let (question, _) = store.insert_example(QuestionSpec::current_example()).await;
        let user = Id::new();
        let now = Utc::now();

        let stranger = Id::new().to_string();
        for choice in [None, Some("not an id"), Some(stranger.as_str())] {
            let result = cast_vote(&*store, user, question.id, choice, now).await;
            assert!(matches!(result, Err(VoteError::NoSelection)), "{choice:?}");
        }
        assert!(store.vote(user, question.id).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn choice_of_another_question_is_no_selection() {
        let store = Records::memory();
        let (question, _) = store.insert_example(QuestionSpec::current_example()).await;
        let (_, other_choices) = store.insert_example(QuestionSpec::published("Other?", -1)).await;

        let foreign = other_choices[0].id.to_string();
        let result = cast_vote(&*store, Id::new(), question.id, Some(&foreign), Utc::now()).await;
        assert!(matches!(result, Err(VoteError::NoSelection)));
        assert_eq!(store.vote_count(other_choices[0].id).await.unwrap(), 0);
    }

    #[rocket::async_test]
    async fn closed_question_is_reported_first() {
        let store = Records::memory();
        let (question, choices) = store.insert_example(QuestionSpec::closed_example()).await;
        let now = Utc::now();

        let result = cast_vote(&*store, Id::new(), question.id, None, now).await;
        assert!(matches!(result, Err(VoteError::VotingClosed)));
        let valid = choices[0].id.to_string();
        let result = cast_vote(&*store, Id::new(), question.id, Some(&valid), now).await;
        assert!(matches!(result, Err(VoteError::VotingClosed)));
        assert_eq!(store.vote_count(choices[0].id).await.unwrap(), 0);
    }

    #[rocket::async_test]
    async fn future_question_cannot_be_voted() {
        let store = Records::memory();
        let (question, choices) = store.insert_example(QuestionSpec::future_example()).await;
        let choice = choices[0].id.to_string();
        let result = cast_vote(&*store, Id::new(), question.id, Some(&choice), Utc::now()).await;
        assert!(matches!(result, Err(VoteError::VotingClosed)));
    }

    #[rocket::async_test]
    async fn unknown_question_is_not_found() {
        let store = Records::memory();
        let missing = Id::new();
        let result = cast_vote(&*store, Id::new(), missing, None, Utc::now()).await;
        assert!(matches!(result, Err(VoteError::NotFound(id)) if id == missing));
    }

    #[rocket::async_test]
    async fn vote_at_close_time_counts() {
        let store = Records::memory();
        let mut spec = QuestionSpec::current_example();
        let close = Utc::now() + Duration::hours(1);
        spec.vote_close_at = Some(close);
        let (question, choices) = store.insert_example(spec).await;

        let choice = choices[0].id.to_string();
        let outcome = cast_vote(&*store, Id::new(), question.id, Some(&choice), close).await;
        assert!(matches!(outcome, Ok(VoteOutcome::Created)));
        let late = close + Duration::milliseconds(1);
        let outcome = cast_vote(&*store, Id::new(), question.id, Some(&choice), late).await;
        assert!(matches!(outcome, Err(VoteError::VotingClosed)));
    }

    #[rocket::async_test]
    async fn detail_is_gated_by_window() {
        let store = Records::memory();
        let now = Utc::now();
        let user = Id::new();
        let (open, choices) = store.insert_example(QuestionSpec::current_example()).await;
        let (closed, _) = store.insert_example(QuestionSpec::closed_example()).await;
        let (future, _) = store.insert_example(QuestionSpec::future_example()).await;

        match gate_detail(&*store, user, open.id, now).await.unwrap() {
            Gate::Allowed(view) => {
                assert_eq!(view.question.id, open.id);
                assert_eq!(view.choices.len(), choices.len());
                assert_eq!(view.selected, None);
                assert_eq!(view.error_message, None);
            }
            Gate::Redirect(message) => panic!("open question redirected: {message}"),
        }

        let closed_message = VoteError::VotingClosed.to_string();
        for id in [closed.id, future.id] {
            let gate = gate_detail(&*store, user, id, now).await.unwrap();
            assert_eq!(gate, Gate::Redirect(closed_message.clone()));
        }

        let missing = Id::new();
        let gate = gate_detail(&*store, user, missing, now).await.unwrap();
        assert_eq!(gate, Gate::Redirect(VoteError::NotFound(missing).to_string()));
    }

    #[rocket::async_test]
    async fn detail_preselects_current_vote() {
        let store = Records::memory();
        let now = Utc::now();
        let user = Id::new();
        let (question, choices) = store.insert_example(QuestionSpec::current_example()).await;
        let choice = choices[1].id.to_string();
        cast_vote(&*store, user, question.id, Some(&choice), now).await.unwrap();

        let gate = gate_detail(&*store, user, question.id, now).await.unwrap();
        assert!(matches!(gate, Gate::Allowed(view) if view.selected == Some(choices[1].id)));

        // Nobody else sees it selected.
        let gate = gate_detail(&*store, Id::new(), question.id, now).await.unwrap();
        assert!(matches!(gate, Gate::Allowed(view) if view.selected.is_none()));
    }

    #[rocket::async_test]
    async fn results_count_votes_even_when_closed() {
        let store = Records::memory();
        let now = Utc::now();
        let (question, choices) = store.insert_example(QuestionSpec::current_example()).await;
        let first = choices[0].id.to_string();
        let second = choices[1].id.to_string();
        cast_vote(&*store, Id::new(), question.id, Some(&first), now).await.unwrap();
        cast_vote(&*store, Id::new(), question.id, Some(&first), now).await.unwrap();
        cast_vote(&*store, Id::new(), question.id, Some(&second), now).await.unwrap();

        let after_close = now + Duration::days(365);
        let view = match gate_results(&*store, question.id, after_close).await.unwrap() {
            Gate::Allowed(view) => view,
            Gate::Redirect(message) => panic!("results redirected: {message}"),
        };
        assert!(!view.question.can_vote);
        let votes = view.choices.iter().map(|c| c.votes).collect::<Vec<_>>();
        assert_eq!(votes, vec![2, 1]);
        assert_eq!(view.total_votes, 3);

        let missing = Id::new();
        let gate = gate_results(&*store, missing, now).await.unwrap();
        assert_eq!(gate, Gate::Redirect(VoteError::NotFound(missing).to_string()));
    }
}
