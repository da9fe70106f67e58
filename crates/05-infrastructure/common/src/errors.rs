//! 错误类型定义

use std::fmt;
use thiserror::Error;

/// 组件钩子返回的错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 组件生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// 准备阶段
    Prepare,
    /// 解析阶段
    Resolve,
    /// 运行阶段
    Run,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Prepare => "prepare",
            Self::Resolve => "resolve",
            Self::Run => "run",
        };
        f.write_str(phase)
    }
}

/// 组件注册表错误类型
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("组件未注册: {name}, 已注册组件: [{}]", .registered.join(", "))]
    DefinitionNotFound {
        name: String,
        registered: Vec<String>,
    },

    #[error("组件尚未解析: {name}, 已解析组件: [{}]", .resolved.join(", "))]
    ValueNotResolved { name: String, resolved: Vec<String> },

    #[error("组件 {component} 的 {phase} 钩子执行失败: {source}")]
    HookFailed {
        component: String,
        phase: HookPhase,
        source: BoxError,
    },

    #[error("检测到循环依赖: {chain}")]
    CircularDependency { chain: String },

    #[error("解析深度超出限制: {name}, 深度: {depth}")]
    ResolutionDepthExceeded { name: String, depth: usize },

    #[error("组件值类型不匹配: {name}, 期望类型: {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("组件定义未绑定注册表，无法执行: {operation}")]
    RegistryUnavailable { operation: &'static str },
}

impl RegistryError {
    /// 创建组件未注册错误
    pub fn definition_not_found(name: impl Into<String>, mut registered: Vec<String>) -> Self {
        registered.sort();
        Self::DefinitionNotFound {
            name: name.into(),
            registered,
        }
    }

    /// 创建组件尚未解析错误
    pub fn value_not_resolved(name: impl Into<String>, mut resolved: Vec<String>) -> Self {
        resolved.sort();
        Self::ValueNotResolved {
            name: name.into(),
            resolved,
        }
    }

    /// 创建钩子执行失败错误
    pub fn hook_failed(component: impl Into<String>, phase: HookPhase, source: BoxError) -> Self {
        Self::HookFailed {
            component: component.into(),
            phase,
            source,
        }
    }

    /// 出错的组件名称（如果有）
    pub fn component_name(&self) -> Option<&str> {
        match self {
            Self::DefinitionNotFound { name, .. }
            | Self::ValueNotResolved { name, .. }
            | Self::ResolutionDepthExceeded { name, .. }
            | Self::TypeMismatch { name, .. } => Some(name),
            Self::HookFailed { component, .. } => Some(component),
            Self::CircularDependency { .. } | Self::RegistryUnavailable { .. } => None,
        }
    }
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置加载失败: {source}")]
    Load { source: BoxError },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },

    #[error("配置绑定失败: {key}, 原因: {source}")]
    Bind {
        key: String,
        source: serde_json::Error,
    },
}

/// 启动错误类型
#[derive(Error, Debug)]
pub enum BootError {
    #[error("配置错误: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("组件注册表错误: {source}")]
    Registry {
        #[from]
        source: RegistryError,
    },

    #[error("组件依赖验证失败: {errors:?}")]
    ValidationFailed { errors: Vec<String> },

    #[error("日志初始化失败: {message}")]
    LoggingInit { message: String },

    #[error("未启用重新加载")]
    ReloadDisabled,

    #[error("启动任务执行失败: {message}")]
    TaskFailed { message: String },
}

/// 结果类型别名
pub type RegistryResult<T> = Result<T, RegistryError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type BootResult<T> = Result<T, BootError>;
