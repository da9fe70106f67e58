//! # 组件注册表实现
//!
//! 提供延迟解析、线程安全的组件注册表。每个组件在第一次被请求时解析，
//! 结果被缓存；并发请求同一个组件时只有一个调用者执行其生命周期，
//! 其余调用者阻塞等待并获得同一个值。

use boot_common::{Configuration, RegistryError, RegistryResult, ResolvedValue};
use dashmap::DashMap;
use boot_di_abstractions::{
    downcast_value, CircularDependencyDetector, ComponentDefinition, ComponentDefinitionBuilder,
    ComponentRegistry, ComputeValue, DefaultCircularDependencyDetector, DependencyGraphNode,
    HookContext, RegistryOptions, RegistryStats, ResolveChain,
};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 单个组件的解析槽，初始化完成即视为已解析
type ResolutionSlot = Arc<OnceCell<ResolvedValue>>;

thread_local! {
    /// 本线程上正在初始化的解析槽，按注册表地址区分
    static IN_FLIGHT: RefCell<Vec<(usize, String)>> = RefCell::new(Vec::new());
}

/// 在作用域内把解析槽登记为本线程正在初始化
struct InFlightGuard;

impl InFlightGuard {
    fn enter(registry: usize, name: &str) -> Self {
        IN_FLIGHT.with(|stack| stack.borrow_mut().push((registry, name.to_string())));
        InFlightGuard
    }

    /// 若 `name` 正由本线程初始化，返回从它开始的初始化链
    fn cycle(registry: usize, name: &str) -> Option<String> {
        IN_FLIGHT.with(|stack| {
            let stack = stack.borrow();
            let names: Vec<&str> = stack
                .iter()
                .filter(|(owner, _)| *owner == registry)
                .map(|(_, n)| n.as_str())
                .collect();
            let start = names.iter().position(|n| *n == name)?;
            let mut chain = names[start..].to_vec();
            chain.push(name);
            Some(chain.join(" -> "))
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        IN_FLIGHT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// 组件注册表
///
/// 组件定义表和解析结果表各自独立加锁，执行组件钩子时不持有任何表锁。
/// 钩子在同一线程上重入自身的解析槽（无论是否经过解析链）会得到
/// [`RegistryError::CircularDependency`]；跨线程形成的依赖环仍会导致死锁。
pub struct Registry<C = Configuration> {
    /// 组件定义
    definitions: RwLock<HashMap<String, Arc<ComponentDefinition<C>>>>,
    /// 解析结果
    resolved: DashMap<String, ResolutionSlot>,
    /// 解析选项
    options: RegistryOptions,
    /// 组件生命周期执行次数
    executions: AtomicU64,
    /// 顶层解析失败次数
    resolution_errors: AtomicU64,
}

impl<C> Registry<C> {
    /// 创建新的注册表
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    /// 使用指定选项创建注册表
    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            resolved: DashMap::new(),
            options,
            executions: AtomicU64::new(0),
            resolution_errors: AtomicU64::new(0),
        }
    }

    /// 解析选项
    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// 注册组件
    ///
    /// `build` 接收绑定了本注册表的构建器；同名定义会被静默覆盖。
    pub fn register<F>(&self, name: impl Into<String>, build: F)
    where
        F: FnOnce(ComponentDefinitionBuilder<'_, C>) -> ComponentDefinitionBuilder<'_, C>,
    {
        let definition = build(ComponentDefinitionBuilder::with_registry(name, self)).build();
        self.register_definition(definition);
    }

    /// 注册组件，构建过程可以失败
    pub fn try_register<F>(&self, name: impl Into<String>, build: F) -> RegistryResult<()>
    where
        F: FnOnce(
            ComponentDefinitionBuilder<'_, C>,
        ) -> RegistryResult<ComponentDefinitionBuilder<'_, C>>,
    {
        let definition = build(ComponentDefinitionBuilder::with_registry(name, self))?.build();
        self.register_definition(definition);
        Ok(())
    }

    /// 注册已构建的组件定义
    pub fn register_definition(&self, definition: ComponentDefinition<C>) {
        let name = definition.name().to_string();
        debug!(
            "注册组件: {} (依赖: {:?})",
            name,
            definition.requirements()
        );

        let previous = self
            .definitions
            .write()
            .insert(name.clone(), Arc::new(definition));
        if previous.is_some() {
            warn!("组件定义被覆盖: {}", name);
        }
    }

    /// 查询组件定义
    pub fn lookup_definition(&self, name: &str) -> RegistryResult<Arc<ComponentDefinition<C>>> {
        let definitions = self.definitions.read();
        definitions.get(name).cloned().ok_or_else(|| {
            RegistryError::definition_not_found(name, definitions.keys().cloned().collect())
        })
    }

    /// 按顺序解析多个组件，遇到第一个错误即停止
    pub fn resolve<I, S>(&self, names: I, configuration: &C) -> RegistryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.resolve_one(name.as_ref(), configuration)?;
        }
        Ok(())
    }

    /// 解析单个组件并返回其值
    pub fn resolve_one(&self, name: &str, configuration: &C) -> RegistryResult<ResolvedValue> {
        self.resolve_in_chain(name, configuration, &ResolveChain::new())
    }

    /// 在给定解析链上解析组件
    pub fn resolve_in_chain(
        &self,
        name: &str,
        configuration: &C,
        chain: &ResolveChain,
    ) -> RegistryResult<ResolvedValue> {
        let result = self.compute_or_store(name, configuration, chain);
        if let Err(e) = &result {
            if chain.depth() == 0 {
                self.resolution_errors.fetch_add(1, Ordering::Relaxed);
                warn!("组件解析失败: {}, 原因: {}", name, e);
            }
        }
        result
    }

    fn compute_or_store(
        &self,
        name: &str,
        configuration: &C,
        chain: &ResolveChain,
    ) -> RegistryResult<ResolvedValue> {
        if let Some(value) = self.cached_value(name) {
            return Ok(value);
        }

        self.options.check(chain, name)?;
        self.check_in_flight(name)?;
        let definition = self.lookup_definition(name)?;
        let slot = self.slot(name);

        slot.get_or_try_init(|| {
            let _guard = InFlightGuard::enter(self.address(), name);
            debug!("开始解析组件: {}", name);
            self.executions.fetch_add(1, Ordering::Relaxed);

            let ctx = HookContext::new(
                self as &dyn ComponentRegistry<C>,
                configuration,
                chain.push(name),
            );
            let value = definition.execute(&ctx)?;

            info!("组件解析完成: {}", name);
            Ok(value)
        })
        .cloned()
    }

    /// 直接标记组件为已解析，已有值时保留原值并返回原值
    pub fn mark_resolved(&self, name: &str, value: ResolvedValue) -> RegistryResult<ResolvedValue> {
        self.mark_resolved_with(name, move || Ok(value))
    }

    /// 直接标记组件为已解析，值由闭包计算且最多计算一次
    ///
    /// 闭包失败时不保存任何值。组件正在本线程上解析时返回
    /// [`RegistryError::CircularDependency`]，钩子应改用
    /// [`HookContext::mark_resolved`] 认领自身的值。
    pub fn mark_resolved_with<F>(&self, name: &str, compute: F) -> RegistryResult<ResolvedValue>
    where
        F: FnOnce() -> RegistryResult<ResolvedValue>,
    {
        if let Some(value) = self.cached_value(name) {
            return Ok(value);
        }
        self.check_in_flight(name)?;

        self.slot(name)
            .get_or_try_init(|| {
                let _guard = InFlightGuard::enter(self.address(), name);
                debug!("标记组件为已解析: {}", name);
                compute()
            })
            .cloned()
    }

    /// 获取已解析组件的值
    pub fn lookup_value(&self, name: &str) -> RegistryResult<ResolvedValue> {
        self.cached_value(name)
            .ok_or_else(|| RegistryError::value_not_resolved(name, self.resolved_names()))
    }

    /// 获取已解析组件的值并转换为指定类型
    pub fn lookup<T>(&self, name: &str) -> RegistryResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        downcast_value(name, self.lookup_value(name)?)
    }

    /// 清空全部已解析的值
    ///
    /// 仅用于开发环境重新加载：与正在进行的解析并发调用时，
    /// 组件值可能在计算完成后立即被丢弃，或被计算两次。
    pub fn reset(&self) {
        warn!("清空已解析组件: {} 个", self.resolved.len());
        self.resolved.clear();
    }

    /// 是否已注册组件定义
    pub fn is_registered(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// 组件是否已解析
    pub fn is_resolved(&self, name: &str) -> bool {
        self.cached_value(name).is_some()
    }

    /// 已注册的组件名称，按字母排序
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// 已解析的组件名称，按字母排序
    pub fn resolved_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .resolved
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// 注册表统计信息
    pub fn stats(&self) -> RegistryStats {
        let registered_components = self.definitions.read().len();
        RegistryStats {
            registered_components,
            resolved_components: self.resolved_names().len(),
            executions: self.executions.load(Ordering::Relaxed),
            resolution_errors: self.resolution_errors.load(Ordering::Relaxed),
        }
    }

    /// 静态检查已注册组件的依赖关系
    pub fn validate(&self) -> Result<(), Vec<RegistryError>> {
        self.validate_with(&DefaultCircularDependencyDetector)
    }

    /// 使用指定检查器检查依赖关系
    pub fn validate_with(
        &self,
        detector: &dyn CircularDependencyDetector,
    ) -> Result<(), Vec<RegistryError>> {
        let graph: Vec<DependencyGraphNode> = self
            .definitions
            .read()
            .values()
            .map(|definition| DependencyGraphNode::from(definition.as_ref()))
            .collect();

        info!("验证组件依赖关系: {} 个组件", graph.len());
        detector.validate(&graph)
    }

    fn address(&self) -> usize {
        self as *const Self as *const () as usize
    }

    /// 重入本线程正在初始化的解析槽会死锁，提前报告为循环依赖
    fn check_in_flight(&self, name: &str) -> RegistryResult<()> {
        match InFlightGuard::cycle(self.address(), name) {
            Some(chain) => Err(RegistryError::CircularDependency { chain }),
            None => Ok(()),
        }
    }

    fn cached_value(&self, name: &str) -> Option<ResolvedValue> {
        self.resolved
            .get(name)
            .and_then(|slot| slot.value().get().cloned())
    }

    /// 获取组件的解析槽，返回前释放分片锁
    fn slot(&self, name: &str) -> ResolutionSlot {
        if let Some(slot) = self.resolved.get(name) {
            return slot.value().clone();
        }
        self.resolved
            .entry(name.to_string())
            .or_default()
            .value()
            .clone()
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("registered", &self.registered_names())
            .field("resolved", &self.resolved_names())
            .field("options", &self.options)
            .finish()
    }
}

impl<C> ComponentRegistry<C> for Registry<C> {
    fn register_definition(&self, definition: ComponentDefinition<C>) {
        Registry::register_definition(self, definition);
    }

    fn lookup_definition(&self, name: &str) -> RegistryResult<Arc<ComponentDefinition<C>>> {
        Registry::lookup_definition(self, name)
    }

    fn resolve_in_chain(
        &self,
        name: &str,
        configuration: &C,
        chain: &ResolveChain,
    ) -> RegistryResult<ResolvedValue> {
        Registry::resolve_in_chain(self, name, configuration, chain)
    }

    fn mark_resolved_with(
        &self,
        name: &str,
        compute: ComputeValue<'_>,
    ) -> RegistryResult<ResolvedValue> {
        Registry::mark_resolved_with(self, name, compute)
    }

    fn lookup_value(&self, name: &str) -> RegistryResult<ResolvedValue> {
        Registry::lookup_value(self, name)
    }

    fn reset(&self) {
        Registry::reset(self);
    }

    fn is_registered(&self, name: &str) -> bool {
        Registry::is_registered(self, name)
    }

    fn is_resolved(&self, name: &str) -> bool {
        Registry::is_resolved(self, name)
    }

    fn registered_names(&self) -> Vec<String> {
        Registry::registered_names(self)
    }

    fn resolved_names(&self) -> Vec<String> {
        Registry::resolved_names(self)
    }

    fn stats(&self) -> RegistryStats {
        Registry::stats(self)
    }
}
