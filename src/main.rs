use lunch_order_planning::adapter::driven::{
    InMemoryDayOfferRepository, InMemoryOrderRepository, InMemoryOrderWindowRepository,
    InMemoryPlanTemplateRepository, LoggingEventPublisher, MySqlDayOfferRepository,
    MySqlOrderRepository, MySqlOrderWindowRepository, MySqlPlanTemplateRepository,
    StaticPresetSource, StaticPromoRuleSource, SystemClock, TracingLogger,
};
use lunch_order_planning::adapter::driver::rest_api::{create_router, AppState};
use lunch_order_planning::adapter::{DatabaseConfig, DatabaseMigration, EngineConfig, StorageBackend};
use lunch_order_planning::application::service::EnginePorts;
use lunch_order_planning::domain::port::{
    DayOfferRepository, OrderRepository, OrderWindowRepository, PlanTemplateRepository,
};
use lunch_order_planning::logging;

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

type Repositories = (
    Arc<dyn OrderRepository>,
    Arc<dyn DayOfferRepository>,
    Arc<dyn OrderWindowRepository>,
    Arc<dyn PlanTemplateRepository>,
);

async fn mysql_repositories() -> Result<Repositories, Box<dyn std::error::Error>> {
    // データベース設定を読み込む
    let config = DatabaseConfig::from_env()?;
    tracing::info!(host = %config.host, port = config.port, "データベース設定を読み込みました");

    // 接続プールを作成
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.connection_string())
        .await?;

    // マイグレーションを実行
    DatabaseMigration::new(pool.clone()).run().await?;
    tracing::info!("データベースマイグレーションを実行しました");

    let repositories: Repositories = (
        Arc::new(MySqlOrderRepository::new(pool.clone())),
        Arc::new(MySqlDayOfferRepository::new(pool.clone())),
        Arc::new(MySqlOrderWindowRepository::new(pool.clone())),
        Arc::new(MySqlPlanTemplateRepository::new(pool)),
    );
    Ok(repositories)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();
    logging::init();

    let config = EngineConfig::from_env()?;
    let settings = config.settings()?;
    tracing::info!(
        cutoff_hour = config.cutoff_hour,
        utc_offset_minutes = config.utc_offset_minutes,
        currency = settings.currency.code(),
        promo_rules = config.promo_rules.len(),
        planner_presets = config.planner_presets.len(),
        "注文エンジンの設定を読み込みました"
    );

    let (order_repository, offer_repository, window_repository, template_repository) =
        match config.storage {
            StorageBackend::MySql => mysql_repositories().await?,
            StorageBackend::InMemory => {
                tracing::warn!("インメモリストレージで起動します（再起動でデータは消えます）");
                let repositories: Repositories = (
                    Arc::new(InMemoryOrderRepository::new()),
                    Arc::new(InMemoryDayOfferRepository::new()),
                    Arc::new(InMemoryOrderWindowRepository::new()),
                    Arc::new(InMemoryPlanTemplateRepository::new()),
                );
                repositories
            }
        };

    let ports = EnginePorts {
        order_repository,
        offer_repository,
        window_repository,
        template_repository,
        promo_source: Arc::new(StaticPromoRuleSource::new(config.promo_rules.clone())),
        preset_source: Arc::new(StaticPresetSource::new(config.planner_presets.clone())),
        clock: Arc::new(SystemClock),
        publisher: Arc::new(LoggingEventPublisher::new()),
        logger: Arc::new(TracingLogger::new()),
    };

    let app = create_router()
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(&ports, settings));

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!(addr = %config.server_addr, "REST APIサーバーを起動しました");

    axum::serve(listener, app).await?;

    Ok(())
}
