//! Gemini-backed study assistant.
//!
//! Each operation is one prompt and one response. Failures never reach the
//! caller: they are logged and replaced by a fixed apology.

use anyhow::anyhow;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::Config,
    db::{Profile, Subject, User},
    AppResult,
};

pub const BIO_FAILED: &str = "Failed to generate bio. Please try again.";
pub const PLAN_FAILED: &str = "Failed to generate a study plan. Please try again.";
pub const SUMMARY_FAILED: &str = "Failed to summarize the notes. Please try again.";
pub const NOTHING_TO_SUMMARIZE: &str = "Nothing to summarize.";

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Clone)]
pub struct Assistant {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl Assistant {
    pub fn new(config: &Config) -> Self {
        if config.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set, assistant features will not work");
        }
        Self {
            client: reqwest::Client::new(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub async fn generate_bio(&self, profile: &Profile, subjects: &[Subject]) -> String {
        match self.generate(&bio_prompt(profile, subjects)).await {
            Ok(text) => text.trim().to_owned(),
            Err(e) => {
                tracing::error!("generating bio: {e}");
                BIO_FAILED.to_owned()
            }
        }
    }

    pub async fn suggest_study_plan(&self, subject: &Subject, members: &[User]) -> String {
        self.generate(&plan_prompt(subject, members)).await.unwrap_or_else(|e| {
            tracing::error!("suggesting study plan: {e}");
            PLAN_FAILED.to_owned()
        })
    }

    pub async fn summarize(&self, notes: &str) -> String {
        if notes.trim().is_empty() {
            return NOTHING_TO_SUMMARIZE.to_owned();
        }
        self.generate(&summary_prompt(notes)).await.unwrap_or_else(|e| {
            tracing::error!("summarizing notes: {e}");
            SUMMARY_FAILED.to_owned()
        })
    }

    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let Some(api_key) = &self.api_key else {
            return Err(anyhow!("no Gemini API key configured").into());
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let resp = self.client.post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini returned {status}: {text}").into());
        }

        let resp: GenerateResponse = resp.json().await?;
        let text: String = resp.candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))?
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            return Err(anyhow!("Gemini returned an empty answer").into());
        }
        Ok(text)
    }
}

fn subject_names(ids: &[i64], subjects: &[Subject]) -> String {
    let names: Vec<&str> = ids
        .iter()
        .filter_map(|id| subjects.iter().find(|s| s.id == *id))
        .map(|s| s.name.as_str())
        .collect();
    if names.is_empty() {
        "None specified".to_owned()
    } else {
        names.join(", ")
    }
}

pub fn bio_prompt(profile: &Profile, subjects: &[Subject]) -> String {
    let methods: Vec<&str> = profile.preferred_methods.iter().map(|m| m.as_str()).collect();
    let availability = match profile.availability.trim() {
        "" => "Not specified",
        a => a,
    };

    format!(
        "Create a short, friendly, and encouraging bio for a student study profile.\n\
         The bio should be about 2-3 sentences long.\n\
         Here are the student's details:\n\
         - Learning Style: {}\n\
         - Preferred Study Methods: {}\n\
         - Subjects they can help with: {}\n\
         - Subjects they need help with: {}\n\
         - Availability: {availability}\n\
         \n\
         Example: \"I'm a visual learner who enjoys collaborative problem-solving sessions. \
         I'm strong in Physics and looking for some help with History. Let's connect and learn together!\"",
        profile.learning_style,
        methods.join(", "),
        subject_names(&profile.subjects_can_help, subjects),
        subject_names(&profile.subjects_need_help, subjects),
    )
}

pub fn plan_prompt(subject: &Subject, members: &[User]) -> String {
    let names: Vec<&str> = members.iter().map(|m| m.username.as_str()).collect();
    format!(
        "Create a simple, 3-step study plan for a new study group.\n\
         The plan should be actionable and focused on a single study session.\n\
         - Subject: {}\n\
         - Group Members: {}\n\
         \n\
         The plan should be formatted as a list.\n\
         Example for Math:\n\
         1.  **Concept Review (15 mins):** Start by quickly reviewing the key formulas and concepts for this week's topic. Each member can share one thing they found challenging.\n\
         2.  **Problem Solving (30 mins):** Work through 5 practice problems together on a shared scratchpad. Take turns explaining your approach.\n\
         3.  **Q&A and Wrap-up (15 mins):** Discuss any lingering questions and set a goal for the next session.",
        subject.name,
        names.join(", "),
    )
}

pub fn summary_prompt(notes: &str) -> String {
    format!(
        "Summarize the following study notes into a few key bullet points.\n\
         Focus on the main ideas and takeaways.\n\
         \n\
         Notes:\n\
         ---\n\
         {notes}\n\
         ---"
    )
}
