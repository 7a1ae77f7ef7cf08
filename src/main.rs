use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use pdf_chat::{
    agents::ReplyAgent,
    config::Config,
    create_router,
    db::{self, MemoryRepository, PgRepository, Repository},
    llm::adapter_from_config,
    storage::FileStorage,
    utils::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    let repo: Arc<dyn Repository> = match &config.database.url {
        Some(url) => {
            let pool = db::create_pool(&config.database, url).await?;

            info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database migrations completed");

            Arc::new(PgRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, documents and chat history are kept in memory only");
            Arc::new(MemoryRepository::new())
        }
    };

    let files = FileStorage::new(&config.storage.media_root);
    files.init().await?;
    info!(media_root = %config.storage.media_root.display(), "File storage ready");

    let adapter = adapter_from_config(&config.llm)?;
    if adapter.is_none() {
        warn!("OPENAI_API_KEY not set, chat replies will explain how to configure it");
    }
    let reply_agent = Arc::new(ReplyAgent::new(adapter, config.llm.model.clone()));

    // Create shared state
    let state = AppState {
        repo,
        files,
        reply_agent,
        config: config.clone(),
    };

    let app = create_router(state);

    // Start server
    let ip: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((ip, config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
