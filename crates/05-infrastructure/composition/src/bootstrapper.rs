//! 组件启动器

use crate::config_sources::ConfigSourceManager;
use boot_common::{BootError, BootResult, Configuration, RegistryResult};
use boot_di_abstractions::RegistryStats;
use boot_di::Registry;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 组件启动器
///
/// 持有注册表和已加载的配置，按顺序解析启动组件。克隆得到的启动器共享
/// 同一个注册表和配置。
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    /// 组件注册表
    registry: Arc<Registry>,
    /// 配置源，重新加载时使用
    config_sources: ConfigSourceManager,
    /// 当前配置
    configuration: Arc<RwLock<Arc<Configuration>>>,
    /// 启动时解析的组件
    boot_components: Vec<String>,
    /// 是否允许重新加载
    reload_enabled: bool,
}

impl Bootstrapper {
    pub(crate) fn new(
        registry: Arc<Registry>,
        config_sources: ConfigSourceManager,
        configuration: Configuration,
        boot_components: Vec<String>,
        reload_enabled: bool,
    ) -> Self {
        Self {
            registry,
            config_sources,
            configuration: Arc::new(RwLock::new(Arc::new(configuration))),
            boot_components,
            reload_enabled,
        }
    }

    /// 组件注册表
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// 当前配置
    pub fn configuration(&self) -> Arc<Configuration> {
        self.configuration.read().clone()
    }

    /// 启动时解析的组件
    pub fn boot_components(&self) -> &[String] {
        &self.boot_components
    }

    /// 按顺序解析全部启动组件，遇到第一个错误即停止
    pub fn boot(&self) -> BootResult<()> {
        info!("开始启动组件: {:?}", self.boot_components);

        let configuration = self.configuration();
        if let Err(e) = self
            .registry
            .resolve(&self.boot_components, configuration.as_ref())
        {
            error!("组件启动失败: {}", e);
            return Err(e.into());
        }

        let stats = self.registry.stats();
        info!(
            "组件启动完成: 已解析 {} / {} 个组件",
            stats.resolved_components, stats.registered_components
        );
        Ok(())
    }

    /// 在阻塞线程池中启动组件
    ///
    /// 组件钩子是同步的，在异步运行时中直接调用会阻塞工作线程。
    pub async fn boot_async(&self) -> BootResult<()> {
        let bootstrapper = self.clone();
        tokio::task::spawn_blocking(move || bootstrapper.boot())
            .await
            .map_err(|e| BootError::TaskFailed {
                message: e.to_string(),
            })?
    }

    /// 使用当前配置解析组件
    pub fn resolve<I, S>(&self, names: I) -> RegistryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let configuration = self.configuration();
        self.registry.resolve(names, configuration.as_ref())
    }

    /// 获取已解析组件的值并转换为指定类型
    pub fn lookup<T>(&self, name: &str) -> RegistryResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.registry.lookup::<T>(name)
    }

    /// 注册表统计信息
    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// 重新加载配置并重新启动全部组件
    ///
    /// 组件定义保持不变，已解析的值全部丢弃。仅用于开发环境。
    pub fn reload(&self) -> BootResult<()> {
        if !self.reload_enabled {
            warn!("未启用重新加载");
            return Err(BootError::ReloadDisabled);
        }

        info!("重新加载配置");
        let configuration = self.config_sources.load()?;
        *self.configuration.write() = Arc::new(configuration);

        self.registry.reset();
        self.boot()
    }
}
