use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::Accounts;
use crate::db::Database;
use crate::error::AppResult;
use crate::model::User;

pub const SESSION_COOKIE: &str = "session";

pub fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password_hash: &str, password: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Resolves the logged-in user from the session cookie, if any.
pub async fn current_user(db: &Database, jar: &CookieJar) -> AppResult<Option<User>> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let user = Accounts::new(db)
        .session_user(cookie.value())
        .await?;
    Ok(user)
}

/// Like [`current_user`], but anonymous visitors are sent to the login page.
pub async fn require_user(db: &Database, jar: &CookieJar) -> Result<User, Response> {
    match current_user(db, jar).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(Redirect::to("/auth/login").into_response()),
        Err(e) => Err(e.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_random_hex() {
        let a = new_token();
        let b = new_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_ne!(hash_token(&a), a);
        assert_eq!(hash_token(&a), hash_token(&a));
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("segredo").unwrap();
        assert!(verify_password(&hash, "segredo"));
        assert!(!verify_password(&hash, "errado"));
        assert!(!verify_password("not a phc string", "segredo"));
    }
}
