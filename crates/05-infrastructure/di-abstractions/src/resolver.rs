//! 组件解析上下文
//!
//! 提供解析链（用于循环依赖检测）、解析选项以及传递给组件钩子的上下文。

use crate::definition::ComponentDefinition;
use crate::registry::ComponentRegistry;
use boot_common::{RegistryError, RegistryResult, ResolvedValue};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::sync::Arc;

/// 解析选项
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// 是否启用循环依赖检测
    pub detect_cycles: bool,
    /// 最大解析深度，0 表示不限制
    pub max_resolution_depth: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            max_resolution_depth: 0,
        }
    }
}

impl RegistryOptions {
    /// 关闭解析链检查和深度限制
    ///
    /// 同一线程上重入正在解析的组件仍会报错，不会死锁。
    pub fn unguarded() -> Self {
        Self {
            detect_cycles: false,
            max_resolution_depth: 0,
        }
    }

    /// 检查能否在给定解析链上继续解析 `name`
    pub fn check(&self, chain: &ResolveChain, name: &str) -> RegistryResult<()> {
        if self.detect_cycles && chain.contains(name) {
            return Err(RegistryError::CircularDependency {
                chain: chain.describe_with(name),
            });
        }
        if self.max_resolution_depth > 0 && chain.depth() >= self.max_resolution_depth {
            return Err(RegistryError::ResolutionDepthExceeded {
                name: name.to_string(),
                depth: chain.depth(),
            });
        }
        Ok(())
    }
}

/// 当前解析路径上正在解析的组件名称
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveChain {
    names: Vec<String>,
}

impl ResolveChain {
    /// 创建空解析链
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回追加了 `name` 的新解析链
    pub fn push(&self, name: &str) -> Self {
        let mut names = self.names.clone();
        names.push(name.to_string());
        Self { names }
    }

    /// 解析链是否包含 `name`
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// 解析深度
    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// 当前正在解析的组件
    pub fn current(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    /// 解析链上的组件名称，从根开始
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 以 `a -> b -> name` 形式描述解析链
    pub fn describe_with(&self, name: &str) -> String {
        self.names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(name))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// 组件钩子上下文
///
/// 持有配置和注册表句柄。通过上下文发起的解析会延续当前解析链。
/// 钩子可以通过 [`HookContext::mark_resolved`] 为当前组件预先认领一个值，
/// 生命周期成功结束后该值代替钩子的返回值被保存。
pub struct HookContext<'a, C> {
    registry: &'a dyn ComponentRegistry<C>,
    configuration: &'a C,
    chain: ResolveChain,
    claimed: OnceCell<ResolvedValue>,
}

impl<'a, C> HookContext<'a, C> {
    /// 创建上下文，`chain` 的最后一项为当前组件
    pub fn new(
        registry: &'a dyn ComponentRegistry<C>,
        configuration: &'a C,
        chain: ResolveChain,
    ) -> Self {
        Self {
            registry,
            configuration,
            chain,
            claimed: OnceCell::new(),
        }
    }

    /// 当前组件名称
    pub fn name(&self) -> &str {
        self.chain.current().unwrap_or_default()
    }

    /// 启动配置
    pub fn configuration(&self) -> &'a C {
        self.configuration
    }

    /// 当前解析链
    pub fn chain(&self) -> &ResolveChain {
        &self.chain
    }

    /// 按顺序解析多个组件，遇到第一个错误即停止
    pub fn resolve<I, S>(&self, names: I) -> RegistryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.resolve_one(name.as_ref())?;
        }
        Ok(())
    }

    /// 解析单个组件并返回其值
    pub fn resolve_one(&self, name: &str) -> RegistryResult<ResolvedValue> {
        self.registry
            .resolve_in_chain(name, self.configuration, &self.chain)
    }

    /// 获取已解析组件的值
    pub fn lookup_value(&self, name: &str) -> RegistryResult<ResolvedValue> {
        self.registry.lookup_value(name)
    }

    /// 获取已解析组件的值并转换为指定类型
    pub fn lookup<T>(&self, name: &str) -> RegistryResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        downcast_value(name, self.registry.lookup_value(name)?)
    }

    /// 是否已注册组件定义
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.is_registered(name)
    }

    /// 组件是否已解析
    pub fn is_resolved(&self, name: &str) -> bool {
        self.registry.is_resolved(name)
    }

    /// 当前组件已认领的值
    pub fn claimed(&self) -> Option<&ResolvedValue> {
        self.claimed.get()
    }

    /// 查询组件定义
    pub fn lookup_definition(&self, name: &str) -> RegistryResult<Arc<ComponentDefinition<C>>> {
        self.registry.lookup_definition(name)
    }

    /// 直接标记组件为已解析，已有值时保留原值
    pub fn mark_resolved(&self, name: &str, value: ResolvedValue) -> RegistryResult<ResolvedValue> {
        self.mark_resolved_with(name, move || Ok(value))
    }

    /// 直接标记组件为已解析，值由闭包计算且最多计算一次
    ///
    /// 标记当前组件时值先由上下文认领，先写入者胜出，生命周期成功后才保存；
    /// 标记解析链上更早的组件返回 [`RegistryError::CircularDependency`]。
    pub fn mark_resolved_with<F>(&self, name: &str, compute: F) -> RegistryResult<ResolvedValue>
    where
        F: FnOnce() -> RegistryResult<ResolvedValue>,
    {
        if self.chain.current() == Some(name) {
            return self.claimed.get_or_try_init(compute).cloned();
        }
        if self.chain.contains(name) {
            return Err(RegistryError::CircularDependency {
                chain: self.chain.describe_with(name),
            });
        }
        self.registry.mark_resolved_with(name, Box::new(compute))
    }
}

/// 将组件值转换为指定类型
pub fn downcast_value<T>(name: &str, value: ResolvedValue) -> RegistryResult<Arc<T>>
where
    T: Any + Send + Sync,
{
    value
        .downcast::<T>()
        .ok_or_else(|| RegistryError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
}
