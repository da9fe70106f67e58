//! 启动构建器

use crate::bootstrapper::Bootstrapper;
use crate::config_sources::ConfigSourceManager;
use boot_common::{BootError, BootResult, RegistryError};
use boot_di::Registry;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// 启动构建器
///
/// 使用建造者模式组装配置源、日志和需要在启动时解析的组件。
pub struct BootBuilder {
    /// 组件注册表
    registry: Arc<Registry>,
    /// 配置源
    config_sources: ConfigSourceManager,
    /// 下一个配置源的优先级，后添加的配置源优先
    next_priority: u32,
    /// 启动时解析的组件
    boot_components: Vec<String>,
    /// 是否启用重新加载
    reload_enabled: bool,
    /// 是否在构建时验证依赖关系
    validation_enabled: bool,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl BootBuilder {
    /// 创建新的启动构建器
    pub fn new() -> Self {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// 使用已有的注册表创建启动构建器
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config_sources: ConfigSourceManager::new(),
            next_priority: 1000,
            boot_components: Vec::new(),
            reload_enabled: false,
            validation_enabled: true,
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
        }
    }

    /// 组件注册表
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(mut self, path: P) -> Self {
        info!("添加 TOML 配置文件: {}", path.as_ref().display());
        let priority = self.take_priority();
        self.config_sources = self.config_sources.add_toml_file(path, priority, true);
        self
    }

    /// 添加 JSON 配置文件
    pub fn add_config_json<P: AsRef<Path>>(mut self, path: P) -> Self {
        info!("添加 JSON 配置文件: {}", path.as_ref().display());
        let priority = self.take_priority();
        self.config_sources = self.config_sources.add_json_file(path, priority, true);
        self
    }

    /// 添加可选配置文件，按扩展名判断格式
    pub fn add_optional_config<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref();
        let priority = self.take_priority();
        debug!("添加可选配置文件: {}", path.display());
        self.config_sources = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => self.config_sources.add_json_file(path, priority, false),
            Some("yaml") | Some("yml") => self.config_sources.add_yaml_file(path, priority, false),
            _ => self.config_sources.add_toml_file(path, priority, false),
        };
        self
    }

    /// 添加环境变量配置源
    pub fn add_config_env_vars<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);
        let priority = self.take_priority();
        self.config_sources = self.config_sources.add_environment(prefix, priority);
        self
    }

    /// 添加内存配置
    pub fn add_config_value(mut self, value: Value) -> Self {
        let priority = self.take_priority();
        self.config_sources = self.config_sources.add_memory(value, priority);
        self
    }

    /// 添加启动时解析的组件
    pub fn boot_component<S: Into<String>>(mut self, name: S) -> Self {
        self.boot_components.push(name.into());
        self
    }

    /// 添加多个启动时解析的组件
    pub fn boot_components<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.boot_components
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// 启用重新加载（仅用于开发环境）
    pub fn enable_reload(mut self, enabled: bool) -> Self {
        self.reload_enabled = enabled;
        if enabled {
            info!("启用组件重新加载");
        }
        self
    }

    /// 启用或禁用依赖关系验证
    pub fn enable_validation(mut self, enabled: bool) -> Self {
        self.validation_enabled = enabled;
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 构建启动器，加载配置但不解析任何组件
    pub fn build(self) -> BootResult<Bootstrapper> {
        // 只有在明确配置了日志时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            init_logging(&self.logging_config)?;
        }

        info!("开始构建启动器");

        let configuration = self.config_sources.load()?;

        if self.validation_enabled {
            self.validate()?;
            info!("组件依赖验证通过");
        }

        info!(
            "启动器构建完成，启动组件: {:?}",
            self.boot_components
        );
        Ok(Bootstrapper::new(
            self.registry,
            self.config_sources,
            configuration,
            self.boot_components,
            self.reload_enabled,
        ))
    }

    fn validate(&self) -> BootResult<()> {
        let mut errors = self.registry.validate().err().unwrap_or_default();

        for name in &self.boot_components {
            if !self.registry.is_registered(name) {
                errors.push(RegistryError::definition_not_found(
                    name.clone(),
                    self.registry.registered_names(),
                ));
            }
        }

        if errors.is_empty() {
            return Ok(());
        }

        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        for message in &messages {
            error!("组件依赖验证失败: {}", message);
        }
        Err(BootError::ValidationFailed { errors: messages })
    }

    fn take_priority(&mut self) -> u32 {
        let priority = self.next_priority;
        self.next_priority = self.next_priority.saturating_sub(1);
        priority
    }
}

impl Default for BootBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 初始化日志系统
///
/// 全局日志系统只能初始化一次，重复初始化返回错误。
pub fn init_logging(config: &LoggingConfig) -> BootResult<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(config.level)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| BootError::LoggingInit {
        message: e.to_string(),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }
}
