use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::storage::filesystem::FilesystemMediaStore;
use mq::{MqConfig, init_mq};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::consumers::consume_publication_events;
use server::notifications::{
    InProcessNotifier, PublicationDelivery, PublicationNotifier, QueueNotifier, build_mailer,
    run_outbox_sweeper,
};
use server::state::AppState;
use server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    seed::seed_role_permissions(&db)
        .await
        .context("Failed to seed roles")?;
    seed::seed_taxonomy(&db)
        .await
        .context("Failed to seed categories and tags")?;
    seed::ensure_indexes(&db).await?;
    if let Some(admin) = &config.admin {
        seed::bootstrap_admin(&db, admin)
            .await
            .context("Failed to create bootstrap admin")?;
    }

    let media = Arc::new(
        FilesystemMediaStore::new(
            config.storage.media_dir.clone(),
            config.storage.public_url.clone(),
            config.storage.max_upload_size,
        )
        .await
        .context("Failed to initialize media storage")?,
    );

    let mailer = build_mailer(&config.mail).context("Failed to configure mailer")?;
    info!(backend = ?config.mail.backend, "Mailer ready");
    let delivery = Arc::new(PublicationDelivery::new(
        db.clone(),
        mailer,
        config.site.clone(),
    ));

    let notifier: Arc<dyn PublicationNotifier> = if config.mq.enabled {
        let mq = Arc::new(
            init_mq(MqConfig {
                url: config.mq.url.clone(),
                pool_size: config.mq.pool_size,
            })
            .await
            .context("Failed to initialize MQ")?,
        );
        info!(queue = %config.mq.queue_name, "MQ connected");

        tokio::spawn(consume_publication_events(
            Arc::clone(&delivery),
            Arc::clone(&mq),
            config.mq.queue_name.clone(),
            config.mq.concurrency,
        ));
        Arc::new(QueueNotifier::new(mq, config.mq.queue_name.clone()))
    } else {
        warn!("MQ disabled, delivering publication events in-process");
        Arc::new(InProcessNotifier::new(Arc::clone(&delivery)))
    };

    tokio::spawn(run_outbox_sweeper(
        db.clone(),
        Arc::clone(&notifier),
        config.outbox.clone(),
    ));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        config,
        media,
        notifier,
    };
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
