use chrono::Utc;
use rocket::{
    form::Form,
    request::FlashMessage,
    response::{Flash, Redirect},
    serde::json::Json,
    Route,
};

use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::{
    api::{
        auth::AuthToken,
        views::{DetailView, IndexView, Notice, ResultsView},
    },
    mongodb::Id,
};
use crate::store::Records;
use crate::voting::{self, Gate, VoteError};

use super::{to_listing, to_login};

pub fn routes() -> Vec<Route> {
    routes![index, detail, detail_login, results, vote, vote_login]
}

#[derive(Responder)]
pub enum DetailPage {
    View(Json<DetailView>),
    Refused(Flash<Redirect>),
}

#[derive(Responder)]
pub enum ResultsPage {
    View(Json<ResultsView>),
    Refused(Flash<Redirect>),
}

#[derive(Responder)]
pub enum VotePage {
    /// Recorded; on to the results.
    Voted(Redirect),
    /// The form again, with an error message.
    Retry(Json<DetailView>),
    Refused(Flash<Redirect>),
}

/// The submitted voting form. The choice is kept raw so that a malformed
/// value is reported like a missing one.
#[derive(Debug, FromForm)]
pub struct VoteForm {
    choice: Option<String>,
}

#[get("/")]
pub async fn index(store: Records, flash: Option<FlashMessage<'_>>) -> Result<Json<IndexView>> {
    let mut view = voting::listing(&*store, Utc::now()).await?;
    view.flash = flash.map(Notice::from);
    Ok(Json(view))
}

#[get("/<question_id>", rank = 1)]
pub async fn detail(token: AuthToken, question_id: Id, store: Records) -> Result<DetailPage> {
    let page = match voting::gate_detail(&*store, token.id, question_id, Utc::now()).await? {
        Gate::Allowed(view) => DetailPage::View(Json(view)),
        Gate::Redirect(message) => DetailPage::Refused(to_listing(message)),
    };
    Ok(page)
}

#[get("/<question_id>", rank = 2)]
pub fn detail_login(question_id: Id) -> Flash<Redirect> {
    to_login(uri!(detail(question_id)))
}

#[get("/<question_id>/results")]
pub async fn results(question_id: Id, store: Records) -> Result<ResultsPage> {
    let page = match voting::gate_results(&*store, question_id, Utc::now()).await? {
        Gate::Allowed(view) => ResultsPage::View(Json(view)),
        Gate::Redirect(message) => ResultsPage::Refused(to_listing(message)),
    };
    Ok(page)
}

#[post("/<question_id>/vote", data = "<form>", rank = 1)]
pub async fn vote(
    token: AuthToken,
    question_id: Id,
    form: Form<VoteForm>,
    store: Records,
    request: RequestId,
) -> Result<VotePage> {
    let now = Utc::now();
    match voting::cast_vote(&*store, token.id, question_id, form.choice.as_deref(), now).await {
        Ok(_) => Ok(VotePage::Voted(Redirect::to(uri!(results(question_id))))),
        Err(VoteError::NoSelection) => {
            debug!("[req{request}] No valid choice submitted for question {question_id}");
            let question = store
                .question(question_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("Question {question_id}")))?;
            let message = VoteError::NoSelection.to_string();
            let view = voting::detail_view(&*store, token.id, &question, now, Some(message)).await?;
            Ok(VotePage::Retry(Json(view)))
        }
        Err(VoteError::Store(err)) => Err(err),
        Err(err) => {
            debug!("[req{request}] Vote refused: {err}");
            Ok(VotePage::Refused(to_listing(err.to_string())))
        }
    }
}

#[post("/<question_id>/vote", rank = 2)]
pub fn vote_login(question_id: Id) -> Flash<Redirect> {
    to_login(uri!(detail(question_id)))
}
