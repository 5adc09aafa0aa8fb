use axum::{debug_handler, extract::{Query, State}, response::Html};
use serde::Deserialize;

use crate::{
    include_res, index,
    matching::{self, Role},
    repo::Repo,
    res::escape,
    session::CurrentUser,
    AppResult, AppState,
};

#[derive(Deserialize)]
pub struct FindQuery {
    subject: Option<String>,
    #[serde(default)]
    role: Role,
}

#[debug_handler(state = AppState)]
pub async fn find(
    State(repo): State<Repo>,
    CurrentUser(user): CurrentUser,
    Query(FindQuery { subject, role }): Query<FindQuery>,
) -> AppResult<Html<String>> {
    // "" is "All Subjects"
    let subject = subject.and_then(|s| s.trim().parse::<i64>().ok());

    let profiles = repo.profiles().await?;
    let users = repo.users().await?;
    let subjects = repo.subjects().await?;

    let found = matching::find_partners(&profiles, user.id, subject, role);
    let mut results = index::partner_cards(&found, &users, &subjects);
    if results.is_empty() {
        results = include_res!(str, "/pages/no_matches.html").to_owned();
    }

    let mut subject_options = String::new();
    for s in &subjects {
        let selected = if Some(s.id) == subject { " selected" } else { "" };
        subject_options += &format!(r#"<option value="{}"{selected}>{}</option>"#, s.id, escape(&s.name));
    }

    let (offering, seeking) = match role {
        Role::Offering => (" selected", ""),
        Role::Seeking => ("", " selected"),
    };

    Ok(Html(
        include_res!(str, "/pages/find.html")
            .replace("{subject_options}", &subject_options)
            .replace("{offering}", offering)
            .replace("{seeking}", seeking)
            .replace("{results}", &results)
    ))
}
