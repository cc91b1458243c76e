//! Server-side HTML for the blog pages.
//!
//! The index page is where like buttons come from: every post gets an
//! `a.like-button[data-post-id]` plus a companion `#like-count-{id}` counter,
//! and the button carries the `curtido` class when the viewer already liked it.

use askama::Template;
use axum::response::Html;
use chrono::NaiveDateTime;

use crate::error::AppResult;
use crate::like::{LIKE_BUTTON_CLASS, LIKED_CLASS, counter_id};
use crate::model::{Post, PostView, Reply, User};

#[derive(Template)]
#[template(path = "auth/register.html")]
struct RegisterTemplate<'a> {
    title: &'a str,
    user: Option<&'a User>,
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate<'a> {
    title: &'a str,
    user: Option<&'a User>,
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "blog/create.html")]
struct CreateTemplate<'a> {
    title: &'a str,
    user: Option<&'a User>,
    error: Option<&'a str>,
    post_title: &'a str,
    body: &'a str,
}

#[derive(Template)]
#[template(path = "blog/update.html")]
struct UpdateTemplate<'a> {
    title: String,
    user: Option<&'a User>,
    error: Option<&'a str>,
    id: i64,
    post_title: &'a str,
    body: &'a str,
}

#[derive(Template)]
#[template(path = "blog/index.html")]
struct IndexTemplate<'a> {
    title: &'a str,
    user: Option<&'a User>,
    error: Option<&'a str>,
    posts: Vec<PostCard<'a>>,
}

/// One post on the index page, with the like markup already resolved.
struct PostCard<'a> {
    id: i64,
    title: &'a str,
    author: &'a str,
    date: String,
    body: &'a str,
    can_edit: bool,
    button_class: String,
    counter_id: String,
    like_count: i64,
    replies: &'a [Reply],
}

impl<'a> PostCard<'a> {
    fn new(viewer: Option<&User>, view: &'a PostView) -> Self {
        let post = &view.post;
        let button_class = if view.liked {
            format!("{LIKE_BUTTON_CLASS} {LIKED_CLASS}")
        } else {
            LIKE_BUTTON_CLASS.to_string()
        };

        Self {
            id: post.id,
            title: &post.title,
            author: &post.author,
            date: display_date(&post.created),
            body: &post.body,
            can_edit: viewer.is_some_and(|u| u.id == post.author_id),
            button_class,
            counter_id: counter_id(&post.id.to_string()),
            like_count: post.like_count,
            replies: &view.replies,
        }
    }
}

fn display_date(created: &str) -> String {
    NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| created.to_string())
}

fn render<T: Template>(template: T) -> AppResult<Html<String>> {
    Ok(Html(template.render()?))
}

pub fn register_page(user: Option<&User>, error: Option<&str>) -> AppResult<Html<String>> {
    render(RegisterTemplate {
        title: "Registrar-se",
        user,
        error,
    })
}

pub fn login_page(user: Option<&User>, error: Option<&str>) -> AppResult<Html<String>> {
    render(LoginTemplate {
        title: "Login",
        user,
        error,
    })
}

/// The new-post form, refilled with what the author typed when `error` is set.
pub fn create_page(user: &User, title: &str, body: &str, error: Option<&str>) -> AppResult<Html<String>> {
    render(CreateTemplate {
        title: "Novo post",
        user: Some(user),
        error,
        post_title: title,
        body,
    })
}

pub fn update_page(user: &User, post: &Post, error: Option<&str>) -> AppResult<Html<String>> {
    render(UpdateTemplate {
        title: format!("Editar \"{}\"", post.title),
        user: Some(user),
        error,
        id: post.id,
        post_title: &post.title,
        body: &post.body,
    })
}

pub fn index_page(user: Option<&User>, posts: &[PostView], error: Option<&str>) -> AppResult<Html<String>> {
    render(IndexTemplate {
        title: "Posts",
        user,
        error,
        posts: posts.iter().map(|view| PostCard::new(user, view)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::like::POST_ID_ATTRIBUTE;

    fn view(liked: bool) -> PostView {
        PostView {
            post: Post {
                id: 42,
                author_id: 1,
                author: "ana".into(),
                title: "<script>alert(1)</script>".into(),
                body: "corpo".into(),
                created: "2024-03-05 10:00:00".into(),
                like_count: 5,
            },
            liked,
            replies: vec![Reply {
                id: 1,
                post_id: 42,
                user_id: 2,
                author: "bia".into(),
                body: "<b>oi</b>".into(),
                created: "2024-03-05 11:00:00".into(),
            }],
        }
    }

    fn ana() -> User {
        User {
            id: 1,
            username: "ana".into(),
            password_hash: String::new(),
        }
    }

    fn body_of(page: AppResult<Html<String>>) -> String {
        page.unwrap().0
    }

    #[test]
    fn renders_like_button_with_companion_counter() {
        let html = body_of(index_page(None, &[view(false)], None));
        assert!(html.contains(&format!(r#"class="like-button" {POST_ID_ATTRIBUTE}="42""#)));
        assert!(html.contains(r#"<span id="like-count-42">5</span>"#));
        assert!(html.contains("05/03/2024"));
        assert!(html.contains("Registrar-se"));
    }

    #[test]
    fn user_content_is_escaped() {
        let html = body_of(index_page(None, &[view(false)], None));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>oi</b>"));
        assert!(html.contains("<strong>bia</strong>"));
    }

    #[test]
    fn liked_posts_carry_the_liked_class() {
        let html = body_of(index_page(None, &[view(true)], None));
        assert!(html.contains(r#"class="like-button curtido""#));
    }

    #[test]
    fn authors_see_edit_link() {
        let ana = ana();
        let html = body_of(index_page(Some(&ana), &[view(false)], None));
        assert!(html.contains(r#"href="/update/42""#));
        assert!(html.contains(r#"action="/reply/42""#));
        assert!(html.contains("Log Out"));
    }

    #[test]
    fn forms_show_the_flash_message_and_keep_input() {
        let ana = ana();
        let html = body_of(create_page(&ana, "", "rascunho", Some("Título é obrigatório.")));
        assert!(html.contains(r#"<div class="flash">Título é obrigatório.</div>"#));
        assert!(html.contains(">rascunho</textarea>"));

        let html = body_of(login_page(None, None));
        assert!(!html.contains("flash"));
    }

    #[test]
    fn update_page_escapes_the_title_attribute() {
        let mut post = view(false).post;
        post.title = r#"a" onfocus="x"#.into();
        let html = body_of(update_page(&ana(), &post, None));
        assert!(!html.contains(r#"value="a" onfocus"#));
        assert!(html.contains(r#"action="/delete/42""#));
    }
}
