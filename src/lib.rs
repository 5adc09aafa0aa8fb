pub mod ai;
pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod find;
pub mod groups;
pub mod index;
pub mod matching;
pub mod profiles;
pub mod realtime;
pub mod repo;
pub mod res;
pub mod session;

use std::{ops::Deref, sync::Arc};

use axum::{extract::FromRef, response::{Html, IntoResponse}, routing::get, Router};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};

use ai::Assistant;
use config::Config;
use realtime::RealtimeStore;
use repo::{MemoryRepo, Repo, SqliteRepo};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub repo: Repo,
    pub store: Arc<RealtimeStore>,
    pub assistant: Arc<Assistant>,
}

impl AppState {
    pub async fn from_config(config: &Config) -> AppResult<AppState> {
        let repo: Repo = match &config.database_url {
            Some(url) => {
                let db_pool = SqlitePoolOptions::new()
                    .max_connections(16)
                    .connect(url)
                    .await?;
                db::migrate(&db_pool).await?;
                db::seed(&db_pool).await?;
                tracing::info!("using sqlite repository at {url}");
                Arc::new(SqliteRepo::new(db_pool))
            }
            None => {
                tracing::info!("DATABASE_URL not set, using in-memory repository");
                Arc::new(MemoryRepo::seeded())
            }
        };

        Ok(AppState {
            repo,
            store: Arc::new(RealtimeStore::new(config.broadcast_capacity)),
            assistant: Arc::new(Assistant::new(config)),
        })
    }
}

pub fn router(state: AppState, config: &Config) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_idle_minutes)));

    Router::new()
        .route("/", get(index::dashboard))
        .route("/find", get(find::find))
        .route("/static/style.css", get(res::stylesheet))

        .merge(auth::router())
        .nest("/profile", profiles::router())
        .nest("/g", groups::router())

        .with_state(state)
        .layer(session_layer)
        .layer(CorsLayer::permissive())
}

/// Renders markdown (such as assistant output) as html. Raw html in the
/// source is shown as text.
pub struct Markdown<T>(pub T);

impl<T> IntoResponse for Markdown<T>
where
    T: Deref<Target = str>
{
    fn into_response(self) -> axum::response::Response {
        use pulldown_cmark::{Event, Options, Parser};

        let parser = Parser::new_ext(&*self.0, Options::ENABLE_STRIKETHROUGH)
            .map(|event| match event {
                Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
                _ => event,
            });

        let mut html_output = String::new();
        pulldown_cmark::html::push_html(&mut html_output, parser);
        Html(html_output).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(md: &str) -> String {
        let body = Markdown(md.to_owned()).into_response().into_body();
        String::from_utf8(to_bytes(body, usize::MAX).await.unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn markdown_renders_emphasis_and_lists() {
        let html = render("1. **Concept Review (15 mins):** go\n2. practice").await;
        assert!(html.contains("<ol>"));
        assert!(html.contains("<strong>Concept Review (15 mins):</strong>"));
    }

    #[tokio::test]
    async fn markdown_escapes_raw_html() {
        let html = render("hi <script>alert(1)</script>").await;
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
