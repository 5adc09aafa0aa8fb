use axum::{debug_handler, extract::State, http::StatusCode, response::{Html, IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{include_res, repo::Repo, res, session, AppError, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct RegisterForm {
    username: String,
    email: String,
}

fn register_html(error: Option<&str>) -> String {
    res::with_error(include_res!(str, "/pages/register.html"), error)
}

#[debug_handler]
pub(crate) async fn register_page() -> impl IntoResponse {
    Html(register_html(None))
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(repo): State<Repo>,
    session: Session,
    Form(RegisterForm { username, email }): Form<RegisterForm>,
) -> AppResult<Response> {
    let user = match super::register(repo.as_ref(), &username, &email).await {
        Ok((user, _)) => user,
        Err(AppError::Conflict(msg)) => {
            return Ok((StatusCode::CONFLICT, Html(register_html(Some(&msg)))).into_response());
        }
        Err(e) => return Err(e),
    };

    session::store_user(&session, &user).await?;
    Ok(Redirect::to("/").into_response())
}
