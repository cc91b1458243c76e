use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use super::Accounts;
use super::session::{SESSION_COOKIE, current_user, hash_password, session_cookie, verify_password};
use crate::api::CredentialsForm;
use crate::error::AppResult;
use crate::handler::AppState;
use crate::{messages, render};

pub async fn show_register(State(state): State<AppState>, jar: CookieJar) -> AppResult<Html<String>> {
    let user = current_user(&state.db, &jar).await?;
    render::register_page(user.as_ref(), None)
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    let viewer = current_user(&state.db, &jar).await?;

    let error = if form.username.is_empty() {
        Some(messages::USERNAME_REQUIRED)
    } else if form.password.is_empty() {
        Some(messages::PASSWORD_REQUIRED)
    } else {
        None
    };

    if let Some(error) = error {
        tracing::info!(username = %form.username, "registration rejected");
        return Ok(render::register_page(viewer.as_ref(), Some(error))?.into_response());
    }

    let password_hash = hash_password(&form.password)?;
    let Some(user) = Accounts::new(&state.db)
        .create_user(&form.username, &password_hash)
        .await?
    else {
        tracing::info!(username = %form.username, "registration rejected: username taken");
        let error = messages::username_taken(&form.username);
        return Ok(render::register_page(viewer.as_ref(), Some(error.as_str()))?.into_response());
    };
    tracing::info!(user_id = user.id, "user registered");

    Ok(Redirect::to("/auth/login").into_response())
}

pub async fn show_login(State(state): State<AppState>, jar: CookieJar) -> AppResult<Html<String>> {
    let user = current_user(&state.db, &jar).await?;
    render::login_page(user.as_ref(), None)
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    let accounts = Accounts::new(&state.db);

    let error = match accounts.find_by_username(&form.username).await? {
        None => Err(messages::USERNAME_INCORRECT),
        Some(user) if !verify_password(&user.password_hash, &form.password) => {
            Err(messages::PASSWORD_INCORRECT)
        }
        Some(user) => Ok(user),
    };

    let user = match error {
        Ok(user) => user,
        Err(msg) => {
            tracing::info!(username = %form.username, "login rejected");
            return Ok(render::login_page(None, Some(msg))?.into_response());
        }
    };

    let token = accounts.create_session(user.id, state.session_ttl_hours).await?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok((jar.add(session_cookie(token)), Redirect::to("/")).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> AppResult<Response> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        Accounts::new(&state.db)
            .delete_session(cookie.value())
            .await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Redirect::to("/")).into_response())
}
