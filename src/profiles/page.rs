use axum::{debug_handler, extract::State, response::Html, Json};
use serde::Serialize;

use crate::{
    db::{LearningStyle, Profile, StudyMethod},
    include_res,
    repo::Repo,
    res::escape,
    session::CurrentUser,
    AppError, AppResult, AppState,
};

use super::ProfileForm;

pub const SAVED: &str = "Profile saved successfully!";

#[derive(Serialize)]
pub(crate) struct Saved {
    notice: &'static str,
    profile: Profile,
}

fn checked(on: bool) -> &'static str {
    if on { " checked" } else { "" }
}

#[debug_handler(state = AppState)]
pub(crate) async fn profile_page(
    State(repo): State<Repo>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Html<String>> {
    let Some(profile) = repo.profile(user.id).await? else {
        return Err(AppError::not_found("Profile not found"));
    };
    let subjects = repo.subjects().await?;

    let style_options: String = LearningStyle::ALL
        .iter()
        .map(|s| {
            let selected = if *s == profile.learning_style { " selected" } else { "" };
            format!(r#"<option value="{s}"{selected}>{s}</option>"#)
        })
        .collect();

    let method_boxes: String = StudyMethod::ALL
        .iter()
        .map(|m| format!(
            r#"<label><input type="checkbox" name="preferredMethods" value="{m}"{}> {m}</label>"#,
            checked(profile.preferred_methods.contains(m)),
        ))
        .collect();

    let subject_boxes = |field: &str, ids: &[i64]| -> String {
        subjects
            .iter()
            .map(|s| format!(
                r#"<label><input type="checkbox" name="{field}" value="{}"{}> {}</label>"#,
                s.id,
                checked(ids.contains(&s.id)),
                escape(&s.name),
            ))
            .collect()
    };

    Ok(Html(
        include_res!(str, "/pages/profile.html")
            .replace("{username}", &escape(&user.username))
            .replace("{style_options}", &style_options)
            .replace("{method_boxes}", &method_boxes)
            .replace("{can_help_boxes}", &subject_boxes("subjectsCanHelp", &profile.subjects_can_help))
            .replace("{need_help_boxes}", &subject_boxes("subjectsNeedHelp", &profile.subjects_need_help))
            .replace("{availability}", &escape(&profile.availability))
            .replace("{bio}", &escape(&profile.bio))
    ))
}

/// Overwrites the signed-in user's profile with the submitted one.
#[debug_handler(state = AppState)]
pub(crate) async fn save_profile(
    State(repo): State<Repo>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<ProfileForm>,
) -> AppResult<Json<Saved>> {
    let Some(current) = repo.profile(user.id).await? else {
        return Err(AppError::not_found("Profile not found"));
    };

    let profile = form.apply(&current);
    repo.save_profile(&profile).await?;
    tracing::debug!("saved profile #{} for u/{}", profile.id, user.id);

    Ok(Json(Saved { notice: SAVED, profile }))
}
