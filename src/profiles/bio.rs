use std::sync::Arc;

use axum::{debug_handler, extract::State, Json};

use crate::{
    ai::Assistant,
    db::Profile,
    repo::Repo,
    session::CurrentUser,
    AppResult, AppState,
};

use super::ProfileForm;

/// Drafts a bio from the (possibly unsaved) form contents.
#[debug_handler(state = AppState)]
pub(crate) async fn generate_bio(
    State(repo): State<Repo>,
    State(assistant): State<Arc<Assistant>>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<ProfileForm>,
) -> AppResult<String> {
    let subjects = repo.subjects().await?;
    let draft = form.apply(&Profile::starter(0, user.id));
    Ok(assistant.generate_bio(&draft, &subjects).await)
}
