//! # 组件启动组合层
//!
//! 将配置加载、日志初始化和组件注册表组合成可运行的启动流程。
//!
//! ## 主要功能
//!
//! - **启动构建器**: 使用建造者模式组装配置源、日志和启动组件
//! - **配置源管理**: 合并 TOML / JSON / YAML 文件、环境变量和内存配置
//! - **启动器**: 按顺序解析启动组件，支持开发环境重新加载
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use boot_composition::BootBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = BootBuilder::new()
//!         .add_config_toml("config/boot.toml")
//!         .add_config_env_vars("BOOT")
//!         .boot_component("db.connection");
//!
//!     builder.registry().register("db.connection", |b| {
//!         b.resolve(|ctx| Ok(ctx.configuration().bind::<String>("db.url")?))
//!     });
//!
//!     let bootstrapper = builder.build()?;
//!     bootstrapper.boot()?;
//!
//!     let url = bootstrapper.lookup::<String>("db.connection")?;
//!     println!("数据库地址: {}", url);
//!     Ok(())
//! }
//! ```

pub mod bootstrapper;
pub mod builder;
pub mod config_sources;

// 重新导出主要类型
pub use bootstrapper::Bootstrapper;
pub use builder::{init_logging, BootBuilder, LoggingConfig};
pub use config_sources::{ConfigSourceDescriptor, ConfigSourceManager, ConfigSourceType};

// 重新导出错误类型
pub use boot_common::{BootError, BootResult};
