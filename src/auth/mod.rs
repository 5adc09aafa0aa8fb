mod login;
mod logout;
mod register;

use axum::{routing::get, Router};

use crate::{
    db::{Profile, User},
    repo::Repository,
    AppError, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/register", get(register::register_page).post(register::register))
        .route("/logout", get(logout::logout))
}

/// Resolves an email (case-insensitively) to its user and profile.
pub async fn login(repo: &dyn Repository, email: &str) -> AppResult<(User, Option<Profile>)> {
    let Some(user) = repo.user_by_email(email.trim()).await? else {
        return Err(AppError::not_found("User not found"));
    };
    let profile = repo.profile(user.id).await?;

    tracing::info!("welcome u/{}#{}", user.username, user.id);
    Ok((user, profile))
}

/// Creates a user plus a starter profile.
pub async fn register(repo: &dyn Repository, username: &str, email: &str) -> AppResult<(User, Profile)> {
    let email = email.trim();
    if repo.user_by_email(email).await?.is_some() {
        return Err(AppError::conflict("Email already in use"));
    }

    let (user, profile) = repo.create_user(username.trim(), email).await?;

    tracing::info!("adding u/{}#{}", user.username, user.id);
    Ok((user, profile))
}
