use rocket::{
    form::Form,
    http::{uri::Origin, Cookie, CookieJar},
    request::FlashMessage,
    response::{Flash, Redirect},
    serde::json::Json,
    Route, State,
};

use crate::config::Config;
use crate::error::Result;
use crate::model::{
    api::{
        auth::{AuthToken, AUTH_TOKEN_COOKIE},
        credentials::Credentials,
        views::{LoginView, Notice},
    },
    db::NewUser,
};
use crate::store::Records;

use super::polls;

pub fn routes() -> Vec<Route> {
    routes![login_page, login, signup, logout]
}

/// Where to go after logging in. Only local paths are followed; anything
/// else falls back to the listing.
fn local_target(next: Option<&str>) -> Origin<'static> {
    next.filter(|next| !next.starts_with("//"))
        .and_then(|next| Origin::parse_owned(next.to_string()).ok())
        .unwrap_or_else(|| uri!(polls::index))
}

#[get("/accounts/login?<next>")]
pub fn login_page(next: Option<String>, flash: Option<FlashMessage<'_>>) -> Json<LoginView> {
    Json(LoginView {
        next,
        flash: flash.map(Notice::from),
    })
}

#[post("/accounts/login?<next>", data = "<credentials>")]
pub async fn login(
    next: Option<String>,
    credentials: Form<Credentials>,
    cookies: &CookieJar<'_>,
    store: Records,
    config: &State<Config>,
) -> Result<Flash<Redirect>> {
    let user = store
        .user_by_name(credentials.username.trim())
        .await?
        .filter(|user| user.verify_password(&credentials.password));

    match user {
        Some(user) => {
            cookies.add_private(AuthToken::new(&user).into_cookie(config)?);
            info!("User {} ({}) logged in", user.username, user.id);
            Ok(Flash::success(
                Redirect::to(local_target(next.as_deref())),
                format!("Welcome back, {}!", user.username),
            ))
        }
        None => {
            warn!("Failed login attempt for '{}'", credentials.username);
            Ok(Flash::error(
                Redirect::to(uri!(login_page(next))),
                "No user found with that username and password.",
            ))
        }
    }
}

#[post("/accounts/signup", data = "<credentials>")]
pub async fn signup(
    credentials: Form<Credentials>,
    cookies: &CookieJar<'_>,
    store: Records,
    config: &State<Config>,
) -> Result<Flash<Redirect>> {
    let user = NewUser::try_from(credentials.into_inner())?;
    let user = store.insert_user(user).await?;
    cookies.add_private(AuthToken::new(&user).into_cookie(config)?);
    info!("Signed up user {} ({})", user.username, user.id);

    Ok(Flash::success(
        Redirect::to(uri!(polls::index)),
        format!("Welcome, {}!", user.username),
    ))
}

#[post("/accounts/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Flash<Redirect> {
    cookies.remove_private(Cookie::named(AUTH_TOKEN_COOKIE));
    Flash::success(Redirect::to(uri!(polls::index)), "You have been logged out.")
}
