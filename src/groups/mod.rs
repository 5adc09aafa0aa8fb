mod assist;
mod board;
mod msg;
mod workspace;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::{
    db::{StudyGroup, Subject, User},
    repo::Repository,
    AppError, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{group_id}", get(workspace::workspace))
        .route("/{group_id}/chat/ws", get(ws::chat_ws))
        .route("/{group_id}/board/ws", get(board::board_ws))
        .route("/{group_id}/plan", post(assist::plan))
        .route("/{group_id}/summarize", post(assist::summarize))
}

/// A group together with its subject and member users.
pub(crate) struct GroupView {
    pub group: StudyGroup,
    pub subject: Subject,
    pub members: Vec<User>,
}

pub(crate) async fn load_group(repo: &dyn Repository, group_id: i64) -> AppResult<GroupView> {
    let not_found = || AppError::not_found("Group not found.");

    let group = repo.group(group_id).await?.ok_or_else(not_found)?;
    let subject = repo.subjects().await?
        .into_iter()
        .find(|s| s.id == group.subject_id)
        .ok_or_else(not_found)?;
    let members = repo.users().await?
        .into_iter()
        .filter(|u| group.members.contains(&u.id))
        .collect();

    Ok(GroupView { group, subject, members })
}

#[cfg(test)]
mod tests {
    use crate::repo::MemoryRepo;

    use super::*;

    #[tokio::test]
    async fn loads_members_and_subject() {
        let view = load_group(&MemoryRepo::seeded(), 2).await.unwrap();
        assert_eq!(view.group.name, "CS Algorithms Crew");
        assert_eq!(view.subject.name, "Computer Science");
        let names: Vec<&str> = view.members.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["Bob", "Charlie"]);
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let err = load_group(&MemoryRepo::seeded(), 42).await.err().unwrap();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Group not found."));
    }
}
