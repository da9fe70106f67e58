//! # Boot Common
//!
//! 组件启动注册表的公共类型。
//!
//! ## 核心类型
//!
//! - [`RegistryError`] - 注册与解析错误
//! - [`ResolvedValue`] - 组件解析结果（可能为空值）
//! - [`Configuration`] - 传递给组件钩子的不透明配置
//! - [`BootError`] - 启动流程错误

pub mod configuration;
pub mod errors;
pub mod value;

pub use configuration::*;
pub use errors::*;
pub use value::*;
