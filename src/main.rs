//! 商城 API 服务主入口

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ecommerce_api_rust::{create_routes, AppComponents, Config, Database};

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "ecommerce-api-rust", version, about = "商城 API 服务")]
struct Cli {
    /// 配置文件路径（默认尝试 appsettings.*）
    #[arg(short, long, env = "APP_CONFIG")]
    config: Option<PathBuf>,

    /// 监听地址，覆盖配置文件
    #[arg(long)]
    host: Option<String>,

    /// 监听端口，覆盖配置文件
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecommerce_api_rust=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载环境变量
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    info!("🚀 启动商城 API 服务");

    let mut config = match Config::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ 配置加载失败: {}", e);
            return Err(e.into());
        }
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    info!("✅ 配置加载成功");

    let database = Database::new(&config).await?;
    info!("✅ 存储初始化成功 ({})", database.backend());

    let components = AppComponents::from_config(&config, database.clone())?;
    let sweeper = (config.cache.sweep_interval_seconds > 0).then(|| {
        components
            .cache
            .spawn_sweeper(Duration::from_secs(config.cache.sweep_interval_seconds))
    });

    let app = create_routes(components)?;
    info!("✅ 路由创建成功");

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("🌐 服务器启动成功，监听地址: {}", address);
    info!("📖 健康检查: http://{}/health", address);

    axum::serve(listener, app)
        .tcp_nodelay(true)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("🛑 接收到关闭信号，正在优雅关闭服务器...");
        })
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    database.close().await;

    Ok(())
}
