use axum::{
    Form, Json,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use super::{Blog, NewPost};
use crate::api::{PostForm, ReplyForm};
use crate::auth::{current_user, require_user};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::handler::AppState;
use crate::model::{LikeState, Post, User};
use crate::{messages, render};

/// Loads a post the viewer is allowed to modify.
async fn owned_post(db: &Database, id: i64, user: &User) -> AppResult<Post> {
    let post = Blog::new(db)
        .get_post(id)
        .await?
        .ok_or(AppError::NotFound(messages::POST_NOT_FOUND))?;

    if post.author_id != user.id {
        tracing::warn!(post_id = id, user_id = user.id, "edit attempt by non-author");
        return Err(AppError::Forbidden);
    }
    Ok(post)
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> AppResult<Html<String>> {
    let user = current_user(&state.db, &jar).await?;
    let posts = Blog::new(&state.db)
        .list_posts(user.as_ref().map(|u| u.id))
        .await?;

    render::index_page(user.as_ref(), &posts, None)
}

pub async fn show_create(State(state): State<AppState>, jar: CookieJar) -> Response {
    match require_user(&state.db, &jar).await {
        Ok(user) => render::create_page(&user, "", "", None).into_response(),
        Err(redirect) => redirect,
    }
}

pub async fn create(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let user = match require_user(&state.db, &jar).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let error = if form.title.is_empty() {
        Some(messages::TITLE_REQUIRED)
    } else if form.body.is_empty() {
        Some(messages::BODY_REQUIRED)
    } else {
        None
    };

    if let Some(error) = error {
        return Ok(render::create_page(&user, &form.title, &form.body, Some(error))?.into_response());
    }

    let id = Blog::new(&state.db)
        .create_post(
            user.id,
            NewPost {
                title: form.title,
                body: form.body,
            },
        )
        .await?;
    tracing::info!(post_id = id, user_id = user.id, "post created");

    Ok(Redirect::to("/").into_response())
}

pub async fn show_update(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let user = match require_user(&state.db, &jar).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let post = owned_post(&state.db, id, &user).await?;
    Ok(render::update_page(&user, &post, None)?.into_response())
}

pub async fn update(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let user = match require_user(&state.db, &jar).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let mut post = owned_post(&state.db, id, &user).await?;

    if form.title.is_empty() {
        post.title = form.title;
        post.body = form.body;
        return Ok(render::update_page(&user, &post, Some(messages::TITLE_REQUIRED))?.into_response());
    }

    Blog::new(&state.db)
        .update_post(id, &form.title, &form.body)
        .await?;
    tracing::info!(post_id = id, "post updated");

    Ok(Redirect::to("/").into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let user = match require_user(&state.db, &jar).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    owned_post(&state.db, id, &user).await?;
    state.db.delete_post(id).await?;
    tracing::info!(post_id = id, "post deleted");

    Ok(Redirect::to("/").into_response())
}

pub async fn reply(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
    Form(form): Form<ReplyForm>,
) -> AppResult<Response> {
    let user = match require_user(&state.db, &jar).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let blog = Blog::new(&state.db);
    if blog.get_post(id).await?.is_none() {
        return Err(AppError::NotFound(messages::POST_NOT_FOUND));
    }

    if form.body.trim().is_empty() {
        let posts = blog.list_posts(Some(user.id)).await?;
        return Ok(render::index_page(Some(&user), &posts, Some(messages::REPLY_REQUIRED))?.into_response());
    }

    let reply_id = blog.add_reply(id, user.id, &form.body).await?;
    tracing::info!(post_id = id, reply_id, "reply added");

    Ok(Redirect::to("/").into_response())
}

/// `GET /like/{id}`: flips the viewer's like and answers with the new state.
pub async fn toggle_like(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> AppResult<Json<LikeState>> {
    let user = current_user(&state.db, &jar)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let like = state
        .db
        .toggle_like(id, user.id)
        .await?
        .ok_or(AppError::NotFound(messages::POST_NOT_FOUND))?;

    tracing::info!(post_id = id, user_id = user.id, liked = like.liked, like_count = like.like_count, "like toggled");
    Ok(Json(like))
}
