use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, Form};
use serde::Deserialize;

use crate::{ai::Assistant, repo::Repo, session::CurrentUser, AppResult, AppState, Markdown};

use super::load_group;

#[derive(Deserialize)]
pub(crate) struct SummarizeForm {
    #[serde(default)]
    notes: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn plan(
    State(repo): State<Repo>,
    State(assistant): State<Arc<Assistant>>,
    CurrentUser(_): CurrentUser,
    Path(group_id): Path<i64>,
) -> AppResult<Markdown<String>> {
    let view = load_group(repo.as_ref(), group_id).await?;
    Ok(Markdown(assistant.suggest_study_plan(&view.subject, &view.members).await))
}

#[debug_handler(state = AppState)]
pub(crate) async fn summarize(
    State(assistant): State<Arc<Assistant>>,
    CurrentUser(_): CurrentUser,
    Path(_group_id): Path<i64>,
    Form(SummarizeForm { notes }): Form<SummarizeForm>,
) -> Markdown<String> {
    Markdown(assistant.summarize(&notes).await)
}
