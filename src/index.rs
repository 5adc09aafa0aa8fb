use axum::{debug_handler, extract::State, response::Html};

use crate::{
    db::{Profile, Subject, User},
    include_res, matching,
    repo::Repo,
    res::escape,
    session::CurrentUser,
    AppResult, AppState,
};

pub(crate) fn subject_name(subjects: &[Subject], id: i64) -> &str {
    subjects.iter().find(|s| s.id == id).map_or("Unknown", |s| s.name.as_str())
}

fn subject_tags(ids: &[i64], subjects: &[Subject], class: &str) -> String {
    ids.iter()
        .map(|id| format!(r#"<span class="tag {class}">{}</span>"#, escape(subject_name(subjects, *id))))
        .collect()
}

/// Card for one potential partner.
pub(crate) fn partner_card(user: &User, profile: &Profile, subjects: &[Subject]) -> String {
    include_res!(str, "/pages/partner_card.html")
        .replace("{username}", &escape(&user.username))
        .replace("{bio}", &escape(&profile.bio))
        .replace("{can_help}", &subject_tags(&profile.subjects_can_help, subjects, "can"))
        .replace("{need_help}", &subject_tags(&profile.subjects_need_help, subjects, "need"))
}

/// Cards for the profiles whose user is known.
pub(crate) fn partner_cards(found: &[&Profile], users: &[User], subjects: &[Subject]) -> String {
    found.iter()
        .filter_map(|p| users.iter().find(|u| u.id == p.user_id).map(|u| partner_card(u, p, subjects)))
        .collect()
}

#[debug_handler(state = AppState)]
pub async fn dashboard(
    State(repo): State<Repo>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Html<String>> {
    let profile = repo.profile(user.id).await?;
    let profiles = repo.profiles().await?;
    let users = repo.users().await?;
    let subjects = repo.subjects().await?;

    let mut group_items = String::new();
    for group in repo.groups_for(user.id).await? {
        group_items += &include_res!(str, "/pages/group_item.html")
            .replace("{id}", &group.id.to_string())
            .replace("{name}", &escape(&group.name))
            .replace("{subject}", &escape(subject_name(&subjects, group.subject_id)));
    }
    if group_items.is_empty() {
        group_items = include_res!(str, "/pages/no_groups.html").to_owned();
    }

    let suggested = matching::suggest_partners(&profiles, user.id, profile.as_ref());
    let mut partner_items = partner_cards(&suggested, &users, &subjects);
    if partner_items.is_empty() {
        partner_items = include_res!(str, "/pages/no_partners.html").to_owned();
    }

    Ok(Html(
        include_res!(str, "/pages/dashboard.html")
            .replace("{username}", &escape(&user.username))
            .replace("{group_items}", &group_items)
            .replace("{partner_items}", &partner_items)
    ))
}
