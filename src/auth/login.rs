use axum::{debug_handler, extract::{Query, State}, http::StatusCode, response::{Html, IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{include_res, repo::Repo, res, session, AppError, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    email: String,
}

fn login_html(error: Option<&str>) -> String {
    res::with_error(include_res!(str, "/pages/login.html"), error)
}

#[debug_handler]
pub(crate) async fn login_page(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    session: Session,
) -> AppResult<Response> {
    if let Some(return_url) = return_url {
        session.insert(session::RETURN_URL, return_url).await?;
    }
    Ok(Html(login_html(None)).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(repo): State<Repo>,
    session: Session,
    Form(LoginForm { email }): Form<LoginForm>,
) -> AppResult<Response> {
    let user = match super::login(repo.as_ref(), &email).await {
        Ok((user, _)) => user,
        Err(AppError::NotFound(msg)) => {
            return Ok((StatusCode::NOT_FOUND, Html(login_html(Some(&msg)))).into_response());
        }
        Err(e) => return Err(e),
    };

    session::store_user(&session, &user).await?;
    let return_url = session.remove::<String>(session::RETURN_URL).await?;

    let return_url = session::safe_return_url(return_url).unwrap_or_else(|| "/".to_owned());

    Ok(Redirect::to(&return_url).into_response())
}
