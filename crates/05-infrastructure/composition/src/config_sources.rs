//! 配置源管理
//!
//! 使用 `config` crate 合并多个配置源，生成传递给组件钩子的 [`Configuration`]。

use boot_common::{ConfigError, ConfigResult, Configuration};
use config::{Environment, File, FileFormat, Source};
use serde_json::Value;
use std::cmp::Reverse;
use std::path::Path;
use tracing::{debug, info};

/// 配置源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSourceType {
    /// TOML 文件
    Toml,
    /// JSON 文件
    Json,
    /// YAML 文件
    Yaml,
    /// 环境变量
    Environment,
    /// 内存配置
    Memory,
}

/// 配置源描述
#[derive(Debug, Clone)]
pub struct ConfigSourceDescriptor {
    /// 配置源类型
    pub source_type: ConfigSourceType,
    /// 文件路径或环境变量前缀
    pub location: String,
    /// 优先级（数字越小优先级越高）
    pub priority: u32,
    /// 文件不存在时是否报错
    pub required: bool,
    /// 内存配置内容
    pub inline: Option<Value>,
}

/// 配置源管理器
///
/// 按优先级合并配置源，同名配置项以优先级高的为准。
#[derive(Debug, Clone, Default)]
pub struct ConfigSourceManager {
    sources: Vec<ConfigSourceDescriptor>,
}

impl ConfigSourceManager {
    /// 创建新的配置源管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加 TOML 文件配置源
    pub fn add_toml_file<P: AsRef<Path>>(self, path: P, priority: u32, required: bool) -> Self {
        self.add_file(ConfigSourceType::Toml, path.as_ref(), priority, required)
    }

    /// 添加 JSON 文件配置源
    pub fn add_json_file<P: AsRef<Path>>(self, path: P, priority: u32, required: bool) -> Self {
        self.add_file(ConfigSourceType::Json, path.as_ref(), priority, required)
    }

    /// 添加 YAML 文件配置源
    pub fn add_yaml_file<P: AsRef<Path>>(self, path: P, priority: u32, required: bool) -> Self {
        self.add_file(ConfigSourceType::Yaml, path.as_ref(), priority, required)
    }

    /// 添加环境变量配置源
    ///
    /// `PREFIX_DB__HOST` 映射为 `db.host`。
    pub fn add_environment(mut self, prefix: impl Into<String>, priority: u32) -> Self {
        let prefix = prefix.into();
        debug!("添加环境变量配置源: {}", prefix);
        self.sources.push(ConfigSourceDescriptor {
            source_type: ConfigSourceType::Environment,
            location: prefix,
            priority,
            required: false,
            inline: None,
        });
        self
    }

    /// 添加内存配置源
    pub fn add_memory(mut self, value: Value, priority: u32) -> Self {
        debug!("添加内存配置源");
        self.sources.push(ConfigSourceDescriptor {
            source_type: ConfigSourceType::Memory,
            location: "memory".to_string(),
            priority,
            required: true,
            inline: Some(value),
        });
        self
    }

    /// 已添加的配置源
    pub fn sources(&self) -> &[ConfigSourceDescriptor] {
        &self.sources
    }

    /// 加载并合并全部配置源
    ///
    /// 文件和环境变量由 `config` 解析，各层在 JSON 值树上逐层合并，
    /// 文件和内存配置中的键保持原有大小写。
    pub fn load(&self) -> ConfigResult<Configuration> {
        info!("开始加载配置，共有 {} 个配置源", self.sources.len());

        let mut ordered: Vec<&ConfigSourceDescriptor> = self.sources.iter().collect();
        // 后合并的层覆盖先合并的层，因此按优先级从低到高合并
        ordered.sort_by_key(|source| Reverse(source.priority));

        let mut configuration = Configuration::new();
        for source in ordered {
            match source.source_type {
                ConfigSourceType::Toml => {
                    configuration.merge(collect_table(&file(source, FileFormat::Toml))?)
                }
                ConfigSourceType::Json => {
                    configuration.merge(collect_table(&file(source, FileFormat::Json))?)
                }
                ConfigSourceType::Yaml => {
                    configuration.merge(collect_table(&file(source, FileFormat::Yaml))?)
                }
                ConfigSourceType::Environment => {
                    let environment = Environment::with_prefix(&source.location)
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true);
                    // 环境变量的键是扁平的点分路径
                    for (key, value) in environment.collect().map_err(load_error)? {
                        configuration.insert(&key, to_json(value)?);
                    }
                }
                ConfigSourceType::Memory => {
                    if let Some(value) = &source.inline {
                        configuration.merge(value.clone());
                    }
                }
            }
        }

        info!("配置加载完成");
        Ok(configuration)
    }

    fn add_file(
        mut self,
        source_type: ConfigSourceType,
        path: &Path,
        priority: u32,
        required: bool,
    ) -> Self {
        debug!("添加 {:?} 配置源: {}", source_type, path.display());
        self.sources.push(ConfigSourceDescriptor {
            source_type,
            location: path.to_string_lossy().to_string(),
            priority,
            required,
            inline: None,
        });
        self
    }
}

fn file(
    source: &ConfigSourceDescriptor,
    format: FileFormat,
) -> File<config::FileSourceFile, FileFormat> {
    File::new(&source.location, format).required(source.required)
}

fn collect_table(source: &dyn Source) -> ConfigResult<Value> {
    let table = source.collect().map_err(load_error)?;
    to_json(config::Value::new(None, config::ValueKind::Table(table)))
}

fn to_json(value: config::Value) -> ConfigResult<Value> {
    value.try_deserialize::<Value>().map_err(load_error)
}

fn load_error(error: config::ConfigError) -> ConfigError {
    ConfigError::Load {
        source: Box::new(error),
    }
}
