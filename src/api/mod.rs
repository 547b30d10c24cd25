use rocket::{
    http::uri::Origin,
    response::{Flash, Redirect},
    Route,
};

use crate::voting::VoteError;

pub mod accounts;
pub mod polls;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(polls::routes());
    routes.extend(accounts::routes());
    routes
}

/// Back to the listing, with an error message to show there.
fn to_listing(message: impl Into<String>) -> Flash<Redirect> {
    Flash::error(Redirect::to(uri!(polls::index)), message)
}

/// To the login page, coming back to `next` afterwards.
fn to_login(next: Origin<'_>) -> Flash<Redirect> {
    Flash::error(
        Redirect::to(uri!(accounts::login_page(Some(next.to_string())))),
        VoteError::Unauthenticated.to_string(),
    )
}
