use chrono::{DateTime, Utc};
use mongodb::{
    bson::{self, doc},
    options::FindOptions,
    Client, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    db::{Choice, NewUser, NewVote, Question, User, Vote},
    mongodb::{ensure_indexes_exist, is_duplicate_key_error, is_write_conflict, Coll, Id},
};

use super::{Store, VoteOutcome};

/// A [`Store`] backed by MongoDB.
///
/// Multi-record writes run inside session transactions, so the server must be
/// a replica set.
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connect to the database and make sure the required indexes exist.
    pub async fn connect(db_uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(db_uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self { client, db })
    }

    fn questions(&self) -> Coll<Question> {
        Coll::from_db(&self.db)
    }

    fn choices_coll(&self) -> Coll<Choice> {
        Coll::from_db(&self.db)
    }

    fn votes(&self) -> Coll<Vote> {
        Coll::from_db(&self.db)
    }

    fn users(&self) -> Coll<User> {
        Coll::from_db(&self.db)
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    fn backend(&self) -> &'static str {
        "MongoDB"
    }

    async fn published_questions(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Question>> {
        let filter = doc! {
            "publish_at": { "$lte": bson::DateTime::from_chrono(now) },
        };
        let options = FindOptions::builder()
            .sort(doc! { "publish_at": -1 })
            .limit(limit as i64)
            .build();
        let questions: Vec<Question> = self
            .questions()
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn question(&self, id: Id) -> Result<Option<Question>> {
        Ok(self.questions().find_one(id.as_doc(), None).await?)
    }

    async fn question_count(&self) -> Result<u64> {
        Ok(self.questions().count_documents(doc! {}, None).await?)
    }

    async fn insert_question(&self, question: &Question) -> Result<()> {
        self.questions().insert_one(question, None).await?;
        Ok(())
    }

    async fn delete_question(&self, id: Id) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .questions()
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }

        // Votes carry their question, so both go by the same filter.
        let owned = doc! { "question_id": id };
        self.choices_coll()
            .delete_many_with_session(owned.clone(), None, &mut session)
            .await?;
        let votes = self
            .votes()
            .delete_many_with_session(owned, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        debug!("Deleted question {id} and {} votes", votes.deleted_count);
        Ok(true)
    }

    async fn choices(&self, question_id: Id) -> Result<Vec<Choice>> {
        // ObjectIds grow with insertion, so this is creation order.
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let choices: Vec<Choice> = self
            .choices_coll()
            .find(doc! { "question_id": question_id }, options)
            .await?
            .try_collect()
            .await?;
        Ok(choices)
    }

    async fn choice(&self, question_id: Id, choice_id: Id) -> Result<Option<Choice>> {
        let filter = doc! {
            "_id": choice_id,
            "question_id": question_id,
        };
        Ok(self.choices_coll().find_one(filter, None).await?)
    }

    async fn insert_choice(&self, choice: &Choice) -> Result<()> {
        if self.question(choice.question_id).await?.is_none() {
            return Err(Error::not_found(format!("Question {}", choice.question_id)));
        }
        self.choices_coll().insert_one(choice, None).await?;
        Ok(())
    }

    async fn vote(&self, user_id: Id, question_id: Id) -> Result<Option<Vote>> {
        let filter = doc! {
            "user_id": user_id,
            "question_id": question_id,
        };
        Ok(self.votes().find_one(filter, None).await?)
    }

    async fn find_or_create_vote(&self, user_id: Id, choice: &Choice) -> Result<VoteOutcome> {
        let votes = self.votes();
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let filter = doc! {
            "user_id": user_id,
            "question_id": choice.question_id,
        };
        let existing = votes
            .find_one_with_session(filter, None, &mut session)
            .await?;

        let written = match existing {
            Some(vote) if vote.choice_id == choice.id => Ok(VoteOutcome::Unchanged),
            Some(vote) => {
                let update = doc! {
                    "$set": { "choice_id": choice.id },
                };
                votes
                    .update_one_with_session(vote.id.as_doc(), update, None, &mut session)
                    .await
                    .map(|_| VoteOutcome::Changed {
                        previous: vote.choice_id,
                    })
            }
            None => {
                let vote = Vote::new(NewVote {
                    user_id,
                    question_id: choice.question_id,
                    choice_id: choice.id,
                });
                votes
                    .insert_one_with_session(&vote, None, &mut session)
                    .await
                    .map(|_| VoteOutcome::Created)
            }
        };

        let outcome = match written {
            Ok(outcome) => outcome,
            Err(err) if is_write_conflict(&err) => {
                return Err(Error::Conflict(format!(
                    "Concurrent vote by user {user_id} on question {}",
                    choice.question_id
                )));
            }
            Err(err) => return Err(err.into()),
        };

        session.commit_transaction().await?;
        Ok(outcome)
    }

    async fn vote_count(&self, choice_id: Id) -> Result<u64> {
        let filter = doc! { "choice_id": choice_id };
        Ok(self.votes().count_documents(filter, None).await?)
    }

    async fn user(&self, id: Id) -> Result<Option<User>> {
        Ok(self.users().find_one(id.as_doc(), None).await?)
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        let filter = doc! { "username": username };
        Ok(self.users().find_one(filter, None).await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let user = User::new(user);
        match self.users().insert_one(&user, None).await {
            Ok(_) => Ok(user),
            Err(err) if is_duplicate_key_error(&err) => Err(Error::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            ))),
            Err(err) => Err(err.into()),
        }
    }
}

/// These tests need a MongoDB replica set at the configured `db_uri` and are
/// skipped when none is set. Each uses a throwaway database.
#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::api::question::QuestionSpec;
    use crate::store::Records;

    async fn connect() -> Option<(MongoStore, Database)> {
        let db_uri = match rocket::Config::figment().extract_inner::<String>("db_uri") {
            Ok(db_uri) => db_uri,
            Err(_) => {
                warn!("No `db_uri` set, skipping MongoDB test");
                return None;
            }
        };
        let store = MongoStore::connect(&db_uri, &format!("polls_test_{}", Id::new()))
            .await
            .unwrap();
        let db = store.db.clone();
        Some((store, db))
    }

    #[rocket::async_test]
    async fn vote_is_created_changed_and_kept() {
        let (store, db) = match connect().await {
            Some(connected) => connected,
            None => return,
        };
        let votes = store.votes();
        let records = Records::new(store);
        let (question, choices) = records.insert_example(QuestionSpec::current_example()).await;
        let user = Id::new();

        let outcome = records.find_or_create_vote(user, &choices[0]).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Created);
        let outcome = records.find_or_create_vote(user, &choices[1]).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Changed { previous: choices[0].id });
        let outcome = records.find_or_create_vote(user, &choices[1]).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Unchanged);

        let vote = records.vote(user, question.id).await.unwrap().unwrap();
        assert_eq!(vote.choice_id, choices[1].id);
        assert_eq!(records.vote_count(choices[0].id).await.unwrap(), 0);
        assert_eq!(records.vote_count(choices[1].id).await.unwrap(), 1);

        // A second vote document for the same user and question is refused.
        let duplicate = Vote::new(NewVote {
            user_id: user,
            question_id: question.id,
            choice_id: choices[0].id,
        });
        let err = votes.insert_one(&duplicate, None).await.unwrap_err();
        assert!(is_duplicate_key_error(&err));

        db.drop(None).await.unwrap();
    }

    #[rocket::async_test]
    async fn delete_question_cascades() {
        let (store, db) = match connect().await {
            Some(connected) => connected,
            None => return,
        };
        let records = Records::new(store);
        let (question, choices) = records.insert_example(QuestionSpec::current_example()).await;
        let user = Id::new();
        records.find_or_create_vote(user, &choices[0]).await.unwrap();

        assert!(records.delete_question(question.id).await.unwrap());
        assert!(records.question(question.id).await.unwrap().is_none());
        assert!(records.choices(question.id).await.unwrap().is_empty());
        assert!(records.vote(user, question.id).await.unwrap().is_none());
        assert!(!records.delete_question(question.id).await.unwrap());

        db.drop(None).await.unwrap();
    }
}
