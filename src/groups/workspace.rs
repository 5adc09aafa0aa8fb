use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, response::Html};

use crate::{
    include_res,
    realtime::{chat::messages_from_snapshot, store::chat_path, RealtimeStore},
    repo::Repo,
    res::escape,
    session::CurrentUser,
    AppResult, AppState,
};

use super::{load_group, msg};

#[debug_handler(state = AppState)]
pub(crate) async fn workspace(
    State(repo): State<Repo>,
    State(store): State<Arc<RealtimeStore>>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<i64>,
) -> AppResult<Html<String>> {
    let view = load_group(repo.as_ref(), group_id).await?;
    let notes = repo.shared_notes(group_id).await?.unwrap_or_default();

    let members: String = view.members
        .iter()
        .map(|m| format!("<li>{}</li>", escape(&m.username)))
        .collect();

    let messages: String = messages_from_snapshot(store.snapshot(&chat_path(group_id)).await)
        .iter()
        .map(|m| msg::msg_to_html(m, user.id))
        .collect();

    Ok(Html(
        include_res!(str, "/pages/groups/workspace.html")
            .replace("{group_id}", &group_id.to_string())
            .replace("{user_id}", &user.id.to_string())
            .replace("{group_name}", &escape(&view.group.name))
            .replace("{subject_name}", &escape(&view.subject.name))
            .replace("{members}", &members)
            .replace("{messages}", &messages)
            .replace("{notes}", &escape(&notes))
    ))
}
