use std::sync::Arc;

use futures_util::{future::BoxFuture, FutureExt};
use sqlx::{types::Json, SqlitePool};
use tokio::sync::RwLock;

use crate::{
    db::{self, Profile, StudyGroup, StudyMethod, Subject, User},
    AppError, AppResult,
};

pub type Repo = Arc<dyn Repository>;

/// Storage capabilities the handlers are written against.
pub trait Repository: Send + Sync {
    fn user(&self, id: i64) -> BoxFuture<'_, AppResult<Option<User>>>;
    /// Case-insensitive.
    fn user_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, AppResult<Option<User>>>;
    fn users(&self) -> BoxFuture<'_, AppResult<Vec<User>>>;
    /// Stores a new user together with their starter profile. Fails with a
    /// conflict when the email is taken; on any failure neither is stored.
    fn create_user<'a>(&'a self, username: &'a str, email: &'a str) -> BoxFuture<'a, AppResult<(User, Profile)>>;

    fn profile(&self, user_id: i64) -> BoxFuture<'_, AppResult<Option<Profile>>>;
    fn profiles(&self) -> BoxFuture<'_, AppResult<Vec<Profile>>>;
    /// Replaces the stored profile with the same id.
    fn save_profile<'a>(&'a self, profile: &'a Profile) -> BoxFuture<'a, AppResult<()>>;

    fn subjects(&self) -> BoxFuture<'_, AppResult<Vec<Subject>>>;
    fn group(&self, id: i64) -> BoxFuture<'_, AppResult<Option<StudyGroup>>>;
    fn groups_for(&self, user_id: i64) -> BoxFuture<'_, AppResult<Vec<StudyGroup>>>;
    fn shared_notes(&self, group_id: i64) -> BoxFuture<'_, AppResult<Option<String>>>;
}

fn email_taken() -> AppError {
    AppError::conflict("Email already in use")
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    profiles: Vec<Profile>,
    subjects: Vec<Subject>,
    groups: Vec<StudyGroup>,
    notes: Vec<(i64, String)>,
}

/// In-memory repository, seeded with the demo data.
pub struct MemoryRepo {
    tables: RwLock<Tables>,
}

impl MemoryRepo {
    pub fn seeded() -> Self {
        Self {
            tables: RwLock::new(Tables {
                users: db::seed_users(),
                profiles: db::seed_profiles(),
                subjects: db::seed_subjects(),
                groups: db::seed_groups(),
                notes: db::seed_notes(),
            }),
        }
    }

    /// Adds a user without a profile.
    #[cfg(test)]
    pub(crate) async fn insert_bare_user(&self, user: User) {
        self.tables.write().await.users.push(user);
    }

    pub fn empty() -> Self {
        Self { tables: RwLock::default() }
    }
}

impl Repository for MemoryRepo {
    fn user(&self, id: i64) -> BoxFuture<'_, AppResult<Option<User>>> {
        async move {
            Ok(self.tables.read().await.users.iter().find(|u| u.id == id).cloned())
        }.boxed()
    }

    fn user_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, AppResult<Option<User>>> {
        async move {
            Ok(
                self.tables.read().await.users.iter()
                    .find(|u| u.email.eq_ignore_ascii_case(email))
                    .cloned()
            )
        }.boxed()
    }

    fn users(&self) -> BoxFuture<'_, AppResult<Vec<User>>> {
        async move { Ok(self.tables.read().await.users.clone()) }.boxed()
    }

    fn create_user<'a>(&'a self, username: &'a str, email: &'a str) -> BoxFuture<'a, AppResult<(User, Profile)>> {
        async move {
            let mut tables = self.tables.write().await;
            if tables.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
                return Err(email_taken());
            }

            let user = User {
                id: tables.users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
                username: username.to_owned(),
                email: email.to_owned(),
            };
            let profile_id = tables.profiles.iter().map(|p| p.id).max().unwrap_or(0) + 1;
            let profile = Profile::starter(profile_id, user.id);

            tables.users.push(user.clone());
            tables.profiles.push(profile.clone());
            Ok((user, profile))
        }.boxed()
    }

    fn profile(&self, user_id: i64) -> BoxFuture<'_, AppResult<Option<Profile>>> {
        async move {
            Ok(self.tables.read().await.profiles.iter().find(|p| p.user_id == user_id).cloned())
        }.boxed()
    }

    fn profiles(&self) -> BoxFuture<'_, AppResult<Vec<Profile>>> {
        async move { Ok(self.tables.read().await.profiles.clone()) }.boxed()
    }

    fn save_profile<'a>(&'a self, profile: &'a Profile) -> BoxFuture<'a, AppResult<()>> {
        async move {
            let mut tables = self.tables.write().await;
            let Some(slot) = tables.profiles.iter_mut().find(|p| p.id == profile.id) else {
                return Err(AppError::not_found("Profile not found"));
            };
            *slot = profile.clone();
            Ok(())
        }.boxed()
    }

    fn subjects(&self) -> BoxFuture<'_, AppResult<Vec<Subject>>> {
        async move { Ok(self.tables.read().await.subjects.clone()) }.boxed()
    }

    fn group(&self, id: i64) -> BoxFuture<'_, AppResult<Option<StudyGroup>>> {
        async move {
            Ok(self.tables.read().await.groups.iter().find(|g| g.id == id).cloned())
        }.boxed()
    }

    fn groups_for(&self, user_id: i64) -> BoxFuture<'_, AppResult<Vec<StudyGroup>>> {
        async move {
            Ok(
                self.tables.read().await.groups.iter()
                    .filter(|g| g.members.contains(&user_id))
                    .cloned()
                    .collect()
            )
        }.boxed()
    }

    fn shared_notes(&self, group_id: i64) -> BoxFuture<'_, AppResult<Option<String>>> {
        async move {
            Ok(
                self.tables.read().await.notes.iter()
                    .find(|(id, _)| *id == group_id)
                    .map(|(_, content)| content.clone())
            )
        }.boxed()
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    user_id: i64,
    bio: String,
    learning_style: String,
    preferred_methods: Json<Vec<StudyMethod>>,
    availability: String,
    subjects_need_help: Json<Vec<i64>>,
    subjects_can_help: Json<Vec<i64>>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = anyhow::Error;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            user_id: row.user_id,
            bio: row.bio,
            learning_style: row.learning_style.parse()?,
            preferred_methods: row.preferred_methods.0,
            availability: row.availability,
            subjects_need_help: row.subjects_need_help.0,
            subjects_can_help: row.subjects_can_help.0,
        })
    }
}

const PROFILE_COLUMNS: &str = "id,user_id,bio,learning_style,preferred_methods,availability,subjects_need_help,subjects_can_help";

/// SQLite-backed repository.
#[derive(Clone)]
pub struct SqliteRepo {
    db_pool: SqlitePool,
}

impl SqliteRepo {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    async fn members(&self, group_id: i64) -> AppResult<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT user_id FROM group_members WHERE group_id=? ORDER BY rowid")
            .bind(group_id)
            .fetch_all(&self.db_pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn load_groups(&self, rows: Vec<(i64, String, i64)>) -> AppResult<Vec<StudyGroup>> {
        let mut groups = Vec::with_capacity(rows.len());
        for (id, name, subject_id) in rows {
            groups.push(StudyGroup {
                id,
                name,
                subject_id,
                members: self.members(id).await?,
            });
        }
        Ok(groups)
    }
}

impl Repository for SqliteRepo {
    fn user(&self, id: i64) -> BoxFuture<'_, AppResult<Option<User>>> {
        async move {
            Ok(
                sqlx::query_as("SELECT id,username,email FROM users WHERE id=?")
                    .bind(id)
                    .fetch_optional(&self.db_pool)
                    .await?
            )
        }.boxed()
    }

    fn user_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, AppResult<Option<User>>> {
        async move {
            Ok(
                sqlx::query_as("SELECT id,username,email FROM users WHERE email=? COLLATE NOCASE")
                    .bind(email)
                    .fetch_optional(&self.db_pool)
                    .await?
            )
        }.boxed()
    }

    fn users(&self) -> BoxFuture<'_, AppResult<Vec<User>>> {
        async move {
            Ok(
                sqlx::query_as("SELECT id,username,email FROM users ORDER BY id")
                    .fetch_all(&self.db_pool)
                    .await?
            )
        }.boxed()
    }

    fn create_user<'a>(&'a self, username: &'a str, email: &'a str) -> BoxFuture<'a, AppResult<(User, Profile)>> {
        async move {
            // dropping the transaction on an early return rolls it back
            let mut tx = self.db_pool.begin().await?;

            let result = sqlx::query("INSERT INTO users (username,email) VALUES (?,?)")
                .bind(username)
                .bind(email)
                .execute(&mut *tx)
                .await;
            let user = match result {
                Ok(done) => User {
                    id: done.last_insert_rowid(),
                    username: username.to_owned(),
                    email: email.to_owned(),
                },
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => return Err(email_taken()),
                Err(e) => return Err(e.into()),
            };

            let starter = Profile::starter(0, user.id);
            let done = sqlx::query("INSERT INTO profiles (user_id,bio,learning_style,preferred_methods,availability,subjects_need_help,subjects_can_help) VALUES (?,?,?,?,?,?,?)")
                .bind(user.id)
                .bind(&starter.bio)
                .bind(starter.learning_style.as_str())
                .bind(Json(&starter.preferred_methods))
                .bind(&starter.availability)
                .bind(Json(&starter.subjects_need_help))
                .bind(Json(&starter.subjects_can_help))
                .execute(&mut *tx)
                .await?;
            let profile = Profile { id: done.last_insert_rowid(), ..starter };

            tx.commit().await?;
            Ok((user, profile))
        }.boxed()
    }

    fn profile(&self, user_id: i64) -> BoxFuture<'_, AppResult<Option<Profile>>> {
        async move {
            let row: Option<ProfileRow> = sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id=?"))
                .bind(user_id)
                .fetch_optional(&self.db_pool)
                .await?;
            Ok(row.map(Profile::try_from).transpose()?)
        }.boxed()
    }

    fn profiles(&self) -> BoxFuture<'_, AppResult<Vec<Profile>>> {
        async move {
            let rows: Vec<ProfileRow> = sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY id"))
                .fetch_all(&self.db_pool)
                .await?;
            Ok(rows.into_iter().map(Profile::try_from).collect::<Result<_, _>>()?)
        }.boxed()
    }

    fn save_profile<'a>(&'a self, profile: &'a Profile) -> BoxFuture<'a, AppResult<()>> {
        async move {
            let done = sqlx::query("UPDATE profiles SET bio=?,learning_style=?,preferred_methods=?,availability=?,subjects_need_help=?,subjects_can_help=? WHERE id=?")
                .bind(&profile.bio)
                .bind(profile.learning_style.as_str())
                .bind(Json(&profile.preferred_methods))
                .bind(&profile.availability)
                .bind(Json(&profile.subjects_need_help))
                .bind(Json(&profile.subjects_can_help))
                .bind(profile.id)
                .execute(&self.db_pool)
                .await?;
            if done.rows_affected() == 0 {
                return Err(AppError::not_found("Profile not found"));
            }
            Ok(())
        }.boxed()
    }

    fn subjects(&self) -> BoxFuture<'_, AppResult<Vec<Subject>>> {
        async move {
            Ok(
                sqlx::query_as("SELECT id,name FROM subjects ORDER BY id")
                    .fetch_all(&self.db_pool)
                    .await?
            )
        }.boxed()
    }

    fn group(&self, id: i64) -> BoxFuture<'_, AppResult<Option<StudyGroup>>> {
        async move {
            let row: Option<(i64, String, i64)> = sqlx::query_as("SELECT id,name,subject_id FROM study_groups WHERE id=?")
                .bind(id)
                .fetch_optional(&self.db_pool)
                .await?;
            Ok(self.load_groups(row.into_iter().collect()).await?.pop())
        }.boxed()
    }

    fn groups_for(&self, user_id: i64) -> BoxFuture<'_, AppResult<Vec<StudyGroup>>> {
        async move {
            let rows: Vec<(i64, String, i64)> = sqlx::query_as(
                "SELECT g.id,g.name,g.subject_id FROM study_groups g JOIN group_members m ON m.group_id=g.id WHERE m.user_id=? ORDER BY g.id"
            )
                .bind(user_id)
                .fetch_all(&self.db_pool)
                .await?;
            self.load_groups(rows).await
        }.boxed()
    }

    fn shared_notes(&self, group_id: i64) -> BoxFuture<'_, AppResult<Option<String>>> {
        async move {
            let row: Option<(String,)> = sqlx::query_as("SELECT content FROM shared_notes WHERE group_id=?")
                .bind(group_id)
                .fetch_optional(&self.db_pool)
                .await?;
            Ok(row.map(|(content,)| content))
        }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn sqlite_repo() -> SqliteRepo {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::migrate(&db_pool).await.unwrap();
        db::seed(&db_pool).await.unwrap();
        SqliteRepo::new(db_pool)
    }

    async fn exercise(repo: &dyn Repository) {
        let alice = repo.user_by_email("ALICE@example.com").await.unwrap().unwrap();
        assert_eq!(alice.id, 1);
        assert_eq!(repo.users().await.unwrap().len(), 4);

        let err = repo.create_user("Imposter", "Bob@Example.com").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let (eve, mut profile) = repo.create_user("Eve", "eve@example.com").await.unwrap();
        assert_eq!(repo.user(eve.id).await.unwrap(), Some(eve.clone()));
        assert_eq!(profile.user_id, eve.id);
        assert_eq!(repo.profile(eve.id).await.unwrap(), Some(profile.clone()));

        profile.bio = "night owl".to_owned();
        profile.preferred_methods = vec![StudyMethod::Flashcards];
        profile.subjects_can_help = vec![6];
        repo.save_profile(&profile).await.unwrap();
        assert_eq!(repo.profile(eve.id).await.unwrap(), Some(profile));

        let physics = repo.group(1).await.unwrap().unwrap();
        assert_eq!(physics.members, vec![1, 3]);
        assert!(repo.group(99).await.unwrap().is_none());

        let charlie_groups: Vec<i64> = repo.groups_for(3).await.unwrap().into_iter().map(|g| g.id).collect();
        assert_eq!(charlie_groups, vec![1, 2]);

        assert!(repo.shared_notes(2).await.unwrap().unwrap().starts_with("Big O"));
        assert_eq!(repo.subjects().await.unwrap()[2].name, "History");
    }

    #[tokio::test]
    async fn memory_repo_capabilities() {
        exercise(&MemoryRepo::seeded()).await;
    }

    #[tokio::test]
    async fn sqlite_repo_capabilities() {
        exercise(&sqlite_repo().await).await;
    }

    #[tokio::test]
    async fn failed_profile_insert_leaves_no_user() {
        let repo = sqlite_repo().await;
        sqlx::query("CREATE TRIGGER refuse_profiles BEFORE INSERT ON profiles BEGIN SELECT RAISE(ABORT, 'profiles are read-only'); END")
            .execute(&repo.db_pool)
            .await
            .unwrap();

        let err = repo.create_user("Eve", "eve@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(repo.user_by_email("eve@example.com").await.unwrap(), None);
        assert_eq!(repo.users().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn saving_unknown_profile_is_not_found() {
        let repo = MemoryRepo::empty();
        let err = repo.save_profile(&Profile::starter(5, 5)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
