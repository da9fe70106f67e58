//! # 示例应用程序
//!
//! 演示如何注册组件、加载配置并按依赖顺序启动组件图。

use boot_common::ResolvedValue;
use boot_composition::{BootBuilder, LoggingConfig};
use clap::Parser;
use boot_di::Registry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "boot-demo")]
#[command(about = "组件启动示例应用")]
struct Args {
    /// 配置文件路径（TOML / JSON / YAML）
    #[arg(short, long)]
    config: Option<String>,

    /// 环境变量前缀，`BOOT_DB__HOST` 映射为 `db.host`
    #[arg(long, default_value = "BOOT")]
    env_prefix: String,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 使用 JSON 格式输出日志
    #[arg(long)]
    json_logs: bool,

    /// 启动的组件，默认启动全部已注册组件
    components: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = LoggingConfig {
        level: parse_log_level(&args.log_level),
        json_format: args.json_logs,
        ..LoggingConfig::default()
    };

    let mut builder = BootBuilder::new()
        .with_logging(logging)
        .add_config_value(default_configuration());

    // 不存在的配置文件按可选处理，使用默认配置
    if let Some(path) = &args.config {
        let exists = Path::new(path).exists();
        builder = match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("json") if exists => builder.add_config_json(path),
            Some("toml") if exists => builder.add_config_toml(path),
            _ => builder.add_optional_config(path),
        };
    }

    let builder = builder.add_config_env_vars(args.env_prefix.clone());
    register_components(builder.registry());

    let components = if args.components.is_empty() {
        builder.registry().registered_names()
    } else {
        args.components.clone()
    };
    let builder = builder.boot_components(components.iter().cloned());

    let bootstrapper = builder.build()?;
    info!("启动组件示例应用");
    bootstrapper.boot_async().await?;

    demonstrate_values(bootstrapper.registry(), &components);

    let stats = bootstrapper.stats();
    info!(
        "注册 {} 个组件，已解析 {} 个，执行 {} 次生命周期，失败 {} 次",
        stats.registered_components,
        stats.resolved_components,
        stats.executions,
        stats.resolution_errors
    );
    Ok(())
}

/// 注册示例组件图
fn register_components(registry: &Registry) {
    registry.register("build.info", |b| {
        // 构建信息在注册时即已确定，无需生命周期
        if let Err(e) = b.mark_resolved(
            "build.info",
            ResolvedValue::new(BuildInfo {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            }),
        ) {
            warn!("标记构建信息失败: {}", e);
        }
        b
    });

    registry.register("settings", |b| {
        b.resolve(|ctx| Ok(ctx.configuration().bind::<AppSettings>("app")?))
    });

    registry.register("db.config", |b| {
        b.resolve(|ctx| Ok(ctx.configuration().bind::<DatabaseConfig>("db")?))
    });

    registry.register("db.connection", |b| {
        b.requires(["db.config"])
            .prepare(|ctx| {
                let config = ctx.lookup::<DatabaseConfig>("db.config")?;
                if config.pool_size == 0 {
                    return Err("db.pool_size 必须大于 0".into());
                }
                Ok(())
            })
            .resolve(|ctx| {
                let config = ctx.lookup::<DatabaseConfig>("db.config")?;
                info!("创建数据库连接池: {}:{}", config.host, config.port);
                Ok(ConnectionPool {
                    url: format!("postgres://{}:{}/{}", config.host, config.port, config.database),
                    size: config.pool_size,
                })
            })
    });

    registry.register("cache", |b| {
        b.requires(["settings"]).resolve(|ctx| {
            let ttl_seconds = ctx
                .configuration()
                .bind::<u64>("cache.ttl_seconds")
                .unwrap_or(60);
            Ok(Cache { ttl_seconds })
        })
    });

    registry.register("migrations", |b| {
        b.requires(["db.connection"]).run(|ctx| {
            let pool = ctx.lookup::<ConnectionPool>("db.connection")?;
            info!("执行数据库迁移: {}", pool.url);
            Ok(())
        })
    });

    registry.register("http.server", |b| {
        b.requires(["build.info", "settings", "db.connection", "cache", "migrations"])
            .resolve(|ctx| {
                let settings = ctx.lookup::<AppSettings>("settings")?;
                let build = ctx.lookup::<BuildInfo>("build.info")?;
                Ok(HttpServer {
                    address: format!("{}:{}", settings.host, settings.port),
                    banner: format!("{} v{}", build.name, build.version),
                })
            })
    });
}

/// 输出已启动组件的值
fn demonstrate_values(registry: &Registry, components: &[String]) {
    for name in components {
        match registry.lookup_value(name) {
            Ok(value) if value.is_empty() => info!("组件 {} 已执行", name),
            Ok(value) => info!("组件 {} 的值: {}", name, describe(&value)),
            Err(e) => warn!("{}", e),
        }
    }
    info!("已解析组件: {:?}", registry.resolved_names());
}

fn describe(value: &ResolvedValue) -> String {
    if let Some(server) = value.downcast::<HttpServer>() {
        format!("{} 监听 {}", server.banner, server.address)
    } else if let Some(pool) = value.downcast::<ConnectionPool>() {
        format!("{} (连接数: {})", pool.url, pool.size)
    } else if let Some(cache) = value.downcast::<Cache>() {
        format!("缓存 TTL {} 秒", cache.ttl_seconds)
    } else {
        format!("{:?}", value)
    }
}

fn default_configuration() -> serde_json::Value {
    json!({
        "app": { "host": "127.0.0.1", "port": 8080 },
        "db": { "host": "localhost", "port": 5432, "database": "boot", "pool_size": 4 },
        "cache": { "ttl_seconds": 300 }
    })
}

/// 解析日志级别
fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

// 示例组件

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppSettings {
    host: String,
    port: u16,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseConfig {
    host: String,
    port: u16,
    database: String,
    pool_size: u32,
}

#[derive(Debug)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug)]
struct ConnectionPool {
    url: String,
    size: u32,
}

#[derive(Debug)]
struct Cache {
    ttl_seconds: u64,
}

#[derive(Debug)]
struct HttpServer {
    address: String,
    banner: String,
}
