//! 组件解析结果

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 组件解析后缓存的值
///
/// 空值是一个有效的解析结果（例如只声明了 `run` 钩子的组件），
/// 与"尚未解析"是两种不同的状态。
#[derive(Clone, Default)]
pub struct ResolvedValue {
    inner: Option<Arc<dyn Any + Send + Sync>>,
}

impl ResolvedValue {
    /// 创建空值
    pub fn empty() -> Self {
        Self { inner: None }
    }

    /// 包装一个具体值
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            inner: Some(Arc::new(value)),
        }
    }

    /// 包装一个已共享的值
    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self { inner: Some(value) }
    }

    /// 是否为空值
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// 是否持有指定类型的值
    pub fn is<T: Any>(&self) -> bool {
        self.inner.as_ref().is_some_and(|value| value.is::<T>())
    }

    /// 转换为指定类型
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.inner.clone()?.downcast::<T>().ok()
    }

    /// 获取底层共享值
    pub fn as_any(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.inner.as_ref()
    }

    /// 两个结果是否指向同一个实例
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(_) => f.write_str("ResolvedValue(<value>)"),
            None => f.write_str("ResolvedValue(<empty>)"),
        }
    }
}
