use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LearningStyle {
    #[default]
    Visual,
    Auditory,
    Kinesthetic,
}

impl LearningStyle {
    pub const ALL: [LearningStyle; 3] = [Self::Visual, Self::Auditory, Self::Kinesthetic];

    pub fn as_str(&self) -> &'static str {
        use LearningStyle::*;
        match self {
            Visual => "Visual",
            Auditory => "Auditory",
            Kinesthetic => "Kinesthetic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyMethod {
    Discussion,
    #[serde(rename = "Problem Solving")]
    ProblemSolving,
    #[serde(rename = "Quiet Review")]
    QuietReview,
    Flashcards,
}

impl StudyMethod {
    pub const ALL: [StudyMethod; 4] = [Self::Discussion, Self::ProblemSolving, Self::QuietReview, Self::Flashcards];

    pub fn as_str(&self) -> &'static str {
        use StudyMethod::*;
        match self {
            Discussion => "Discussion",
            ProblemSolving => "Problem Solving",
            QuietReview => "Quiet Review",
            Flashcards => "Flashcards",
        }
    }
}

macro_rules! text_enum {
    ($E:ty) => {
        impl fmt::Display for $E {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $E {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$E>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| anyhow::anyhow!("unknown {} {s:?}", stringify!($E)))
            }
        }
    };
}

text_enum!(LearningStyle);
text_enum!(StudyMethod);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub bio: String,
    pub learning_style: LearningStyle,
    pub preferred_methods: Vec<StudyMethod>,
    pub availability: String,
    pub subjects_need_help: Vec<i64>,
    pub subjects_can_help: Vec<i64>,
}

impl Profile {
    /// Profile created alongside a freshly registered user.
    pub fn starter(id: i64, user_id: i64) -> Profile {
        Profile {
            id,
            user_id,
            bio: String::new(),
            learning_style: LearningStyle::Visual,
            preferred_methods: Vec::new(),
            availability: "Weekends".to_owned(),
            subjects_need_help: Vec::new(),
            subjects_can_help: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGroup {
    pub id: i64,
    pub name: String,
    pub subject_id: i64,
    pub members: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store key; not part of the stored value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub sender_id: i64,
    pub sender_username: String,
    pub group_id: i64,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhiteboardPoint {
    pub x: f32,
    pub y: f32,
}

impl WhiteboardPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhiteboardLine {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub points: Vec<WhiteboardPoint>,
    pub color: String,
    pub brush_size: f32,
}

// seed data

pub fn seed_users() -> Vec<User> {
    [
        (1, "Alice", "alice@example.com"),
        (2, "Bob", "bob@example.com"),
        (3, "Charlie", "charlie@example.com"),
        (4, "Diana", "diana@example.com"),
    ]
    .into_iter()
    .map(|(id, username, email)| User { id, username: username.to_owned(), email: email.to_owned() })
    .collect()
}

pub fn seed_subjects() -> Vec<Subject> {
    ["Mathematics", "Physics", "History", "Computer Science", "Literature", "Chemistry"]
        .into_iter()
        .zip(1..)
        .map(|(name, id)| Subject { id, name: name.to_owned() })
        .collect()
}

pub fn seed_profiles() -> Vec<Profile> {
    use LearningStyle::*;
    use StudyMethod::*;

    vec![
        Profile {
            id: 1,
            user_id: 1,
            bio: "Visual learner who enjoys breaking down complex problems. Strong in Math, but could use a hand with History essays.".to_owned(),
            learning_style: Visual,
            preferred_methods: vec![ProblemSolving, QuietReview],
            availability: "Weeknights".to_owned(),
            subjects_can_help: vec![1, 2],
            subjects_need_help: vec![3],
        },
        Profile {
            id: 2,
            user_id: 2,
            bio: "Auditory learner, I find discussing topics helps me understand them best. Happy to help with History and Literature.".to_owned(),
            learning_style: Auditory,
            preferred_methods: vec![Discussion],
            availability: "Weekends".to_owned(),
            subjects_can_help: vec![3, 5],
            subjects_need_help: vec![4],
        },
        Profile {
            id: 3,
            user_id: 3,
            bio: "I'm a hands-on, kinesthetic learner. I excel at coding challenges and can help with Computer Science concepts. Looking for a partner for Physics.".to_owned(),
            learning_style: Kinesthetic,
            preferred_methods: vec![ProblemSolving],
            availability: "Afternoons".to_owned(),
            subjects_can_help: vec![4],
            subjects_need_help: vec![2],
        },
        Profile {
            id: 4,
            user_id: 4,
            bio: "I love diving deep into Literature and Chemistry. I prefer quiet review sessions but am open to discussion. Need some help with advanced Math.".to_owned(),
            learning_style: Visual,
            preferred_methods: vec![QuietReview, Flashcards],
            availability: "Mornings".to_owned(),
            subjects_can_help: vec![5, 6],
            subjects_need_help: vec![1],
        },
    ]
}

pub fn seed_groups() -> Vec<StudyGroup> {
    vec![
        StudyGroup { id: 1, name: "Physics Problem Solvers".to_owned(), subject_id: 2, members: vec![1, 3] },
        StudyGroup { id: 2, name: "CS Algorithms Crew".to_owned(), subject_id: 4, members: vec![2, 3] },
    ]
}

pub fn seed_notes() -> Vec<(i64, String)> {
    vec![
        (1, "Force = mass * acceleration\nKey concepts for Chapter 5:\n- Newton's Laws\n- Friction\n- Gravity on inclined planes".to_owned()),
        (2, "Big O Notation:\nO(1) - Constant\nO(log n) - Logarithmic\nO(n) - Linear\nO(n log n) - Log-linear\nO(n^2) - Quadratic".to_owned()),
    ]
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE
    )",
    "CREATE TABLE IF NOT EXISTS profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
        bio TEXT NOT NULL,
        learning_style TEXT NOT NULL,
        preferred_methods TEXT NOT NULL,
        availability TEXT NOT NULL,
        subjects_need_help TEXT NOT NULL,
        subjects_can_help TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS subjects (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS study_groups (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        subject_id INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS group_members (
        group_id INTEGER NOT NULL REFERENCES study_groups(id),
        user_id INTEGER NOT NULL REFERENCES users(id),
        PRIMARY KEY (group_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS shared_notes (
        group_id INTEGER PRIMARY KEY REFERENCES study_groups(id),
        content TEXT NOT NULL
    )",
];

pub async fn migrate(db_pool: &SqlitePool) -> AppResult<()> {
    for stmt in SCHEMA {
        sqlx::query(stmt).execute(db_pool).await?;
    }
    Ok(())
}

/// Inserts the seed rows unless users already exist.
pub async fn seed(db_pool: &SqlitePool) -> AppResult<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(db_pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    tracing::info!("seeding empty database");
    let mut tx = db_pool.begin().await?;

    for User { id, username, email } in seed_users() {
        sqlx::query("INSERT INTO users (id,username,email) VALUES (?,?,?)")
            .bind(id)
            .bind(username)
            .bind(email)
            .execute(&mut *tx)
            .await?;
    }

    for Subject { id, name } in seed_subjects() {
        sqlx::query("INSERT INTO subjects (id,name) VALUES (?,?)")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    for profile in seed_profiles() {
        sqlx::query("INSERT INTO profiles (id,user_id,bio,learning_style,preferred_methods,availability,subjects_need_help,subjects_can_help) VALUES (?,?,?,?,?,?,?,?)")
            .bind(profile.id)
            .bind(profile.user_id)
            .bind(&profile.bio)
            .bind(profile.learning_style.as_str())
            .bind(serde_json::to_string(&profile.preferred_methods)?)
            .bind(&profile.availability)
            .bind(serde_json::to_string(&profile.subjects_need_help)?)
            .bind(serde_json::to_string(&profile.subjects_can_help)?)
            .execute(&mut *tx)
            .await?;
    }

    for StudyGroup { id, name, subject_id, members } in seed_groups() {
        sqlx::query("INSERT INTO study_groups (id,name,subject_id) VALUES (?,?,?)")
            .bind(id)
            .bind(name)
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
        for user_id in members {
            sqlx::query("INSERT INTO group_members (group_id,user_id) VALUES (?,?)")
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    for (group_id, content) in seed_notes() {
        sqlx::query("INSERT INTO shared_notes (group_id,content) VALUES (?,?)")
            .bind(group_id)
            .bind(content)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn study_method_wire_names() {
        let json = serde_json::to_string(&vec![StudyMethod::ProblemSolving, StudyMethod::Flashcards]).unwrap();
        assert_eq!(json, r#"["Problem Solving","Flashcards"]"#);
        assert_eq!("Quiet Review".parse::<StudyMethod>().unwrap(), StudyMethod::QuietReview);
        assert!("Osmosis".parse::<StudyMethod>().is_err());
    }

    #[test]
    fn message_key_is_not_stored() {
        let msg = Message {
            id: String::new(),
            sender_id: 1,
            sender_username: "Alice".to_owned(),
            group_id: 1,
            text: "hi".to_owned(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["senderUsername"], "Alice");
        assert_eq!(value["timestamp"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn starter_profile_defaults() {
        let profile = Profile::starter(7, 9);
        assert_eq!(profile.availability, "Weekends");
        assert_eq!(profile.learning_style, LearningStyle::Visual);
        assert!(profile.subjects_can_help.is_empty() && profile.subjects_need_help.is_empty());
    }
}
