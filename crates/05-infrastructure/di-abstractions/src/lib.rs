//! # Dependency Injection Abstractions
//!
//! 组件定义与注册表抽象层。
//!
//! ## 核心接口
//!
//! - [`ComponentDefinition`] - 组件定义（依赖 + prepare / resolve / run 钩子）
//! - [`ComponentDefinitionBuilder`] - 组件定义构建器
//! - [`ComponentRegistry`] - 组件注册表接口
//! - [`HookContext`] - 传递给组件钩子的上下文
//! - [`CircularDependencyDetector`] - 依赖图静态检查

pub mod definition;
pub mod registry;
pub mod resolver;

pub use definition::*;
pub use registry::*;
pub use resolver::*;
