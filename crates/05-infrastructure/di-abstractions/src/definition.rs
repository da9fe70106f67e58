//! 组件定义
//!
//! 组件定义由名称、依赖列表以及 prepare / resolve / run 三个可选钩子组成，
//! 通过 [`ComponentDefinitionBuilder`] 构建，构建完成后不可变。

use crate::registry::ComponentRegistry;
use crate::resolver::HookContext;
use boot_common::{BoxError, HookPhase, RegistryError, RegistryResult, ResolvedValue};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 钩子返回结果
pub type HookResult<T> = Result<T, BoxError>;

/// 只产生副作用的钩子（prepare / run）
pub type SideEffectHook<C> = Arc<dyn Fn(&HookContext<'_, C>) -> HookResult<()> + Send + Sync>;

/// 产生组件值的钩子（resolve）
pub type ResolveHook<C> =
    Arc<dyn Fn(&HookContext<'_, C>) -> HookResult<ResolvedValue> + Send + Sync>;

/// 组件定义
pub struct ComponentDefinition<C> {
    name: String,
    requirements: Vec<String>,
    prepare: Option<SideEffectHook<C>>,
    resolve: Option<ResolveHook<C>>,
    run: Option<SideEffectHook<C>>,
}

impl<C> ComponentDefinition<C> {
    /// 创建不绑定注册表的构建器
    pub fn builder(name: impl Into<String>) -> ComponentDefinitionBuilder<'static, C> {
        ComponentDefinitionBuilder::new(name)
    }

    /// 组件名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 依赖的组件名称，按声明顺序
    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    /// 是否声明了 prepare 钩子
    pub fn has_prepare(&self) -> bool {
        self.prepare.is_some()
    }

    /// 是否声明了 resolve 钩子
    pub fn has_resolve(&self) -> bool {
        self.resolve.is_some()
    }

    /// 是否声明了 run 钩子
    pub fn has_run(&self) -> bool {
        self.run.is_some()
    }

    /// 执行组件生命周期
    ///
    /// 依次解析全部依赖、调用 prepare，然后调用 run（若存在，结果为空值）
    /// 或 resolve。钩子通过上下文认领了当前组件的值时，以认领的值为结果。
    ///
    /// 钩子错误包装为 [`RegistryError::HookFailed`]，原始错误保存在 `source`
    /// 中，可以用 `source.downcast_ref::<E>()` 取回具体类型；
    /// 依赖解析错误以及钩子转发的 [`RegistryError`] 原样返回。
    pub fn execute(&self, ctx: &HookContext<'_, C>) -> RegistryResult<ResolvedValue> {
        for requirement in &self.requirements {
            ctx.resolve_one(requirement)?;
        }

        if let Some(prepare) = &self.prepare {
            debug!("执行 prepare 钩子: {}", self.name);
            prepare(ctx).map_err(|e| self.hook_failed(HookPhase::Prepare, e))?;
        }

        let value = if let Some(run) = &self.run {
            debug!("执行 run 钩子: {}", self.name);
            run(ctx).map_err(|e| self.hook_failed(HookPhase::Run, e))?;
            ResolvedValue::empty()
        } else if let Some(resolve) = &self.resolve {
            debug!("执行 resolve 钩子: {}", self.name);
            resolve(ctx).map_err(|e| self.hook_failed(HookPhase::Resolve, e))?
        } else {
            ResolvedValue::empty()
        };

        Ok(ctx.claimed().cloned().unwrap_or(value))
    }

    /// 钩子内部通过上下文发起的解析错误原样返回
    fn hook_failed(&self, phase: HookPhase, source: BoxError) -> RegistryError {
        match source.downcast::<RegistryError>() {
            Ok(inner) => *inner,
            Err(source) => RegistryError::hook_failed(self.name.clone(), phase, source),
        }
    }
}

impl<C> fmt::Debug for ComponentDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("requirements", &self.requirements)
            .field("prepare", &self.prepare.as_ref().map(|_| "<function>"))
            .field("resolve", &self.resolve.as_ref().map(|_| "<function>"))
            .field("run", &self.run.as_ref().map(|_| "<function>"))
            .finish()
    }
}

/// 组件定义构建器
///
/// 每个声明方法都会覆盖之前的同类声明。通过注册表创建的构建器还可以
/// 查询其他组件定义，或直接标记某个名称为已解析。
pub struct ComponentDefinitionBuilder<'r, C> {
    name: String,
    requirements: Vec<String>,
    prepare: Option<SideEffectHook<C>>,
    resolve: Option<ResolveHook<C>>,
    run: Option<SideEffectHook<C>>,
    registry: Option<&'r dyn ComponentRegistry<C>>,
}

impl<C> ComponentDefinitionBuilder<'static, C> {
    /// 创建新的构建器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirements: Vec::new(),
            prepare: None,
            resolve: None,
            run: None,
            registry: None,
        }
    }
}

impl<'r, C> ComponentDefinitionBuilder<'r, C> {
    /// 创建绑定注册表的构建器
    pub fn with_registry(name: impl Into<String>, registry: &'r dyn ComponentRegistry<C>) -> Self {
        Self {
            name: name.into(),
            requirements: Vec::new(),
            prepare: None,
            resolve: None,
            run: None,
            registry: Some(registry),
        }
    }

    /// 组件名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明依赖，替换之前声明的依赖列表
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements = names.into_iter().map(Into::into).collect();
        self
    }

    /// 声明 prepare 钩子
    pub fn prepare<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookContext<'_, C>) -> HookResult<()> + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(hook));
        self
    }

    /// 声明 resolve 钩子，返回值作为组件值缓存
    pub fn resolve<T, F>(mut self, hook: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&HookContext<'_, C>) -> HookResult<T> + Send + Sync + 'static,
    {
        self.resolve = Some(Arc::new(move |ctx: &HookContext<'_, C>| {
            hook(ctx).map(ResolvedValue::new)
        }));
        self
    }

    /// 声明直接返回 [`ResolvedValue`] 的 resolve 钩子
    pub fn resolve_value<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookContext<'_, C>) -> HookResult<ResolvedValue> + Send + Sync + 'static,
    {
        self.resolve = Some(Arc::new(hook));
        self
    }

    /// 声明 run 钩子；声明后 resolve 钩子不会被调用，组件值为空值
    pub fn run<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookContext<'_, C>) -> HookResult<()> + Send + Sync + 'static,
    {
        self.run = Some(Arc::new(hook));
        self
    }

    /// 查询已注册的组件定义
    pub fn lookup_definition(&self, name: &str) -> RegistryResult<Arc<ComponentDefinition<C>>> {
        self.registry("lookup_definition")?.lookup_definition(name)
    }

    /// 直接标记组件为已解析，已有值时保留原值
    pub fn mark_resolved(
        &self,
        name: &str,
        value: ResolvedValue,
    ) -> RegistryResult<ResolvedValue> {
        self.registry("mark_resolved")?
            .mark_resolved_with(name, Box::new(move || Ok(value)))
    }

    /// 直接标记组件为已解析，值由闭包计算且最多计算一次
    pub fn mark_resolved_with<F>(&self, name: &str, compute: F) -> RegistryResult<ResolvedValue>
    where
        F: FnOnce() -> RegistryResult<ResolvedValue>,
    {
        self.registry("mark_resolved_with")?
            .mark_resolved_with(name, Box::new(compute))
    }

    /// 完成构建
    pub fn build(self) -> ComponentDefinition<C> {
        ComponentDefinition {
            name: self.name,
            requirements: self.requirements,
            prepare: self.prepare,
            resolve: self.resolve,
            run: self.run,
        }
    }

    fn registry(&self, operation: &'static str) -> RegistryResult<&'r dyn ComponentRegistry<C>> {
        self.registry
            .ok_or(RegistryError::RegistryUnavailable { operation })
    }
}
