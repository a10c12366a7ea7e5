use crypto_alert_bot::{ AppError, Config, Result };
use crypto_alert_bot::alert_checker::AlertChecker;
use crypto_alert_bot::bot::{ TelegramNotifier, run_bot };
use crypto_alert_bot::chains::EvmProvider;
use crypto_alert_bot::db::AlertRepository;
use crypto_alert_bot::providers::{ AlertStore, BlockchainProvider, MarketDataProvider, Notifier };
use crypto_alert_bot::services::{ PriceAlertService, PriceService, TokenIndex };
use crypto_alert_bot::wallet_monitor::WalletMonitor;
use migration::MigratorTrait;
use axum::{ Router, routing::get };
use std::collections::HashMap;
use std::sync::Arc;
use teloxide::Bot;
use tokio::sync::watch;
use tower_http::{ cors::CorsLayer, trace::TraceLayer };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "crypto_alert_bot=debug,tower_http=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    tracing::info!("Starting crypto-alert-bot for networks: {:?}", config.configured_networks());

    // Initialize database connection
    let db = sea_orm::Database
        ::connect(&config.database_url).await
        .map_err(AppError::Database)?;

    tracing::info!("Database connected successfully");

    // Run migrations
    migration::Migrator::up(&db, None).await.map_err(AppError::Database)?;

    tracing::info!("Migrations completed successfully");

    // Initialize repository
    let repository = Arc::new(AlertRepository::new(db));
    let store: Arc<dyn AlertStore> = repository.clone();

    // Initialize market data provider and token index
    let price_service = Arc::new(PriceService::new());
    let market: Arc<dyn MarketDataProvider> = price_service.clone();

    let token_index = match price_service.supported_tokens().await {
        Ok(tokens) => {
            tracing::info!("Loaded {} supported tokens from CoinGecko", tokens.len());
            Arc::new(TokenIndex::new(tokens))
        }
        Err(e) => {
            tracing::warn!("Failed to load token list, starting with empty index: {}", e);
            Arc::new(TokenIndex::new(Vec::new()))
        }
    };

    // Initialize Telegram bot and notifier
    let bot = Bot::new(&config.telegram_bot_token);
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone()));

    // Initialize services
    let alert_service = Arc::new(
        PriceAlertService::new(
            store.clone(),
            market.clone(),
            token_index.clone(),
            notifier.clone(),
            config.monitor.exact_tolerance,
            config.default_min_value
        )
    );

    // Spawn background workers with a shared shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let checker = AlertChecker::new(
        store.clone(),
        market.clone(),
        token_index.clone(),
        notifier.clone(),
        config.monitor.clone()
    );
    let checker_task = tokio::spawn(checker.run(shutdown_rx.clone()));

    let chain: Arc<dyn BlockchainProvider> = Arc::new(EvmProvider::new(&config.network_configs)?);
    let explorer_urls: HashMap<_, _> = config.network_configs
        .iter()
        .map(|(network, cfg)| (*network, cfg.explorer_url.clone()))
        .collect();

    let monitor = Arc::new(
        WalletMonitor::new(
            store.clone(),
            chain,
            notifier.clone(),
            config.configured_networks(),
            explorer_urls,
            config.block_poll_interval
        )
    );
    let monitor_task = tokio::spawn(monitor.run(shutdown_rx));

    // Start health check server
    let app = Router::new()
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Health server listening on {}", addr);

    let listener = tokio::net::TcpListener
        ::bind(&addr).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let server_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    // Run the bot dispatcher until Ctrl-C
    run_bot(bot, alert_service, repository, token_index).await;

    // Dispatcher has exited; stop background workers and wait for them
    tracing::info!("Shutting down background workers...");
    let _ = shutdown_tx.send(true);
    let _ = checker_task.await;
    let _ = monitor_task.await;
    server_task.abort();

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
