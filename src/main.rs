use studysync::{config::Config, router, AppResult, AppState};

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,studysync=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::from_config(&config).await?;
    let app = router(app_state, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
