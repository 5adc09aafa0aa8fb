use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::{db::User, AppResult};

/// The single slot holding the serialized signed-in user.
pub const USER_SLOT: &str = "studySyncUser";
pub const RETURN_URL: &str = "return_url";

/// Reads the signed-in user. A slot that fails to deserialize is logged,
/// dropped, and treated as no session.
pub async fn load_user(session: &Session) -> Option<User> {
    match session.get::<User>(USER_SLOT).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("discarding malformed session entry: {e}");
            if let Err(e) = session.remove_value(USER_SLOT).await {
                tracing::warn!("couldn't clear session entry: {e}");
            }
            None
        }
    }
}

pub async fn store_user(session: &Session, user: &User) -> AppResult<()> {
    session.insert(USER_SLOT, user).await?;
    Ok(())
}

pub async fn clear(session: &Session) {
    session.clear().await;
}

/// Keeps `url` only if it is a path on this site. Scheme-relative
/// (`//host`) and backslash (`/\host`) forms are refused.
pub fn safe_return_url(url: Option<String>) -> Option<String> {
    url.filter(|url| {
        url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
    })
}

/// The login page, coming back to `path_and_query` afterwards.
pub fn login_url(path_and_query: &str) -> String {
    format!("/login?return_url={}", urlencoding::encode(path_and_query))
}

/// The signed-in user, required by the handler. Redirects to the login page
/// when there is none.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match load_user(&session).await {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                // nested routers see a stripped uri
                let uri = parts.extensions.get::<OriginalUri>().map_or(&parts.uri, |original| &original.0);
                let here = uri.path_and_query().map_or("/", |pq| pq.as_str());
                Err(Redirect::to(&login_url(here)).into_response())
            }
        }
    }
}
