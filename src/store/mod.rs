//! Record storage for questions, choices, votes and users.
//!
//! Routes and the vote service only ever see the [`Store`] trait, through the
//! managed [`Records`] handle. [`MongoStore`] is the production backend;
//! [`MemoryStore`] keeps everything in process and backs the test suite.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::{
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::error::Result;
use crate::model::{
    api::question::QuestionSpec,
    db::{Choice, NewUser, Question, User, Vote},
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// What [`Store::find_or_create_vote`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The user had no vote on this question yet.
    Created,
    /// The user's existing vote was moved from `previous` to the new choice.
    Changed { previous: Id },
    /// The user's existing vote was already for this choice.
    Unchanged,
}

#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// Short name of the backend, for logging.
    fn backend(&self) -> &'static str;

    /// Questions published at or before `now`, newest first, at most `limit`.
    async fn published_questions(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Question>>;

    async fn question(&self, id: Id) -> Result<Option<Question>>;

    async fn question_count(&self) -> Result<u64>;

    async fn insert_question(&self, question: &Question) -> Result<()>;

    /// Delete a question along with its choices and every vote on them.
    /// Returns whether the question existed.
    async fn delete_question(&self, id: Id) -> Result<bool>;

    /// The choices of a question, in the order they were added.
    async fn choices(&self, question_id: Id) -> Result<Vec<Choice>>;

    /// A choice, only if it belongs to the given question.
    async fn choice(&self, question_id: Id, choice_id: Id) -> Result<Option<Choice>>;

    async fn insert_choice(&self, choice: &Choice) -> Result<()>;

    /// The user's vote on a question, if they have cast one.
    async fn vote(&self, user_id: Id, question_id: Id) -> Result<Option<Vote>>;

    /// Atomically find the user's vote on the choice's question and point it
    /// at `choice`, creating it if there is none. Exactly one vote exists for
    /// the pair afterwards.
    async fn find_or_create_vote(&self, user_id: Id, choice: &Choice) -> Result<VoteOutcome>;

    /// Number of votes currently for a choice.
    async fn vote_count(&self, choice_id: Id) -> Result<u64>;

    async fn user(&self, id: Id) -> Result<Option<User>>;

    async fn user_by_name(&self, username: &str) -> Result<Option<User>>;

    /// Insert a new user, failing with [`Error::Conflict`](crate::error::Error::Conflict)
    /// if the username is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User>;
}

/// Shared handle on the configured [`Store`], kept in managed state.
#[derive(Clone)]
pub struct Records(Arc<dyn Store>);

impl Records {
    pub fn new(store: impl Store + 'static) -> Self {
        Self(Arc::new(store))
    }

    /// A handle on a fresh, empty [`MemoryStore`].
    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl Deref for Records {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Records {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        req.guard::<&State<Records>>()
            .await
            .map(|records| records.inner().clone())
    }
}

/// Insert seed questions and their choices. Every question is validated
/// before anything is written.
pub async fn load_questions(store: &dyn Store, specs: Vec<QuestionSpec>) -> Result<usize> {
    let records = specs
        .into_iter()
        .map(QuestionSpec::into_records)
        .collect::<Result<Vec<_>>>()?;

    let count = records.len();
    for (question, choices) in records {
        store.insert_question(&question).await?;
        for choice in choices {
            store.insert_choice(&Choice::new(choice)).await?;
        }
        debug!("Seeded question {} ({})", question.id, question.text);
    }
    Ok(count)
}
