mod bio;
mod page;

use axum::{routing::{get, post}, Router};
use serde::Deserialize;

use crate::{
    db::{LearningStyle, Profile, StudyMethod},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(page::profile_page).post(page::save_profile))
        .route("/bio", post(bio::generate_bio))
}

/// The editable part of a profile, as submitted by the profile form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    #[serde(default)]
    pub bio: String,
    pub learning_style: LearningStyle,
    #[serde(default)]
    pub preferred_methods: Vec<StudyMethod>,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub subjects_need_help: Vec<i64>,
    #[serde(default)]
    pub subjects_can_help: Vec<i64>,
}

impl ProfileForm {
    /// Replaces every editable field of `profile`.
    pub fn apply(self, profile: &Profile) -> Profile {
        Profile {
            id: profile.id,
            user_id: profile.user_id,
            bio: self.bio,
            learning_style: self.learning_style,
            preferred_methods: self.preferred_methods,
            availability: self.availability,
            subjects_need_help: self.subjects_need_help,
            subjects_can_help: self.subjects_can_help,
        }
    }
}
