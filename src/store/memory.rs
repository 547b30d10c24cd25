use chrono::{DateTime, Utc};
use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    db::{Choice, NewUser, NewVote, Question, User, Vote},
    mongodb::Id,
};

use super::{Store, VoteOutcome};

/// An in-process [`Store`].
///
/// All records sit behind a single lock, which is held across each
/// read-then-write, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    questions: Vec<Question>,
    choices: Vec<Choice>,
    votes: Vec<Vote>,
    users: Vec<User>,
}

#[rocket::async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "in-memory"
    }

    async fn published_questions(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Question>> {
        let state = self.state.lock().await;
        let mut published = state
            .questions
            .iter()
            .filter(|question| question.window().is_published(now))
            .cloned()
            .collect::<Vec<_>>();
        published.sort_by(|a, b| b.publish_at.cmp(&a.publish_at));
        published.truncate(limit);
        Ok(published)
    }

    async fn question(&self, id: Id) -> Result<Option<Question>> {
        let state = self.state.lock().await;
        Ok(state.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn question_count(&self) -> Result<u64> {
        Ok(self.state.lock().await.questions.len() as u64)
    }

    async fn insert_question(&self, question: &Question) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.questions.iter().any(|q| q.id == question.id) {
            return Err(Error::Conflict(format!("Question {} already exists", question.id)));
        }
        state.questions.push(question.clone());
        Ok(())
    }

    async fn delete_question(&self, id: Id) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.questions.len();
        state.questions.retain(|q| q.id != id);
        if state.questions.len() == before {
            return Ok(false);
        }
        state.choices.retain(|c| c.question_id != id);
        state.votes.retain(|v| v.question_id != id);
        Ok(true)
    }

    async fn choices(&self, question_id: Id) -> Result<Vec<Choice>> {
        let state = self.state.lock().await;
        Ok(state
            .choices
            .iter()
            .filter(|c| c.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn choice(&self, question_id: Id, choice_id: Id) -> Result<Option<Choice>> {
        let state = self.state.lock().await;
        Ok(state
            .choices
            .iter()
            .find(|c| c.id == choice_id && c.question_id == question_id)
            .cloned())
    }

    async fn insert_choice(&self, choice: &Choice) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.questions.iter().any(|q| q.id == choice.question_id) {
            return Err(Error::not_found(format!("Question {}", choice.question_id)));
        }
        state.choices.push(choice.clone());
        Ok(())
    }

    async fn vote(&self, user_id: Id, question_id: Id) -> Result<Option<Vote>> {
        let state = self.state.lock().await;
        Ok(state
            .votes
            .iter()
            .find(|v| v.user_id == user_id && v.question_id == question_id)
            .cloned())
    }

    async fn find_or_create_vote(&self, user_id: Id, choice: &Choice) -> Result<VoteOutcome> {
        let mut state = self.state.lock().await;
        let existing = state
            .votes
            .iter()
            .position(|v| v.user_id == user_id && v.question_id == choice.question_id);

        let outcome = match existing {
            Some(i) if state.votes[i].choice_id == choice.id => VoteOutcome::Unchanged,
            Some(i) => {
                let previous = state.votes[i].choice_id;
                state.votes[i].choice_id = choice.id;
                VoteOutcome::Changed { previous }
            }
            None => {
                state.votes.push(Vote::new(NewVote {
                    user_id,
                    question_id: choice.question_id,
                    choice_id: choice.id,
                }));
                VoteOutcome::Created
            }
        };
        Ok(outcome)
    }

    async fn vote_count(&self, choice_id: Id) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state.votes.iter().filter(|v| v.choice_id == choice_id).count() as u64)
    }

    async fn user(&self, id: Id) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(Error::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }
        let user = User::new(user);
        state.users.push(user.clone());
        Ok(user)
    }
}
