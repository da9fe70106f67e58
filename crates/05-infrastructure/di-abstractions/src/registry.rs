//! 组件注册表抽象接口

use crate::definition::ComponentDefinition;
use crate::resolver::ResolveChain;
use boot_common::{RegistryError, RegistryResult, ResolvedValue};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 组件值的延迟计算闭包
pub type ComputeValue<'a> = Box<dyn FnOnce() -> RegistryResult<ResolvedValue> + 'a>;

/// 组件注册表 trait
///
/// 组件钩子和构建器通过此接口回调注册表。
pub trait ComponentRegistry<C>: Send + Sync {
    /// 注册组件定义，覆盖同名定义
    fn register_definition(&self, definition: ComponentDefinition<C>);

    /// 查询组件定义
    fn lookup_definition(&self, name: &str) -> RegistryResult<Arc<ComponentDefinition<C>>>;

    /// 在给定解析链上解析组件
    fn resolve_in_chain(
        &self,
        name: &str,
        configuration: &C,
        chain: &ResolveChain,
    ) -> RegistryResult<ResolvedValue>;

    /// 计算并保存组件值；已有值时不调用 `compute`，直接返回已有值
    fn mark_resolved_with(&self, name: &str, compute: ComputeValue<'_>)
        -> RegistryResult<ResolvedValue>;

    /// 获取已解析组件的值
    fn lookup_value(&self, name: &str) -> RegistryResult<ResolvedValue>;

    /// 清空全部已解析的值，组件定义保持不变
    fn reset(&self);

    /// 是否已注册组件定义
    fn is_registered(&self, name: &str) -> bool;

    /// 组件是否已解析
    fn is_resolved(&self, name: &str) -> bool;

    /// 已注册的组件名称，按字母排序
    fn registered_names(&self) -> Vec<String>;

    /// 已解析的组件名称，按字母排序
    fn resolved_names(&self) -> Vec<String>;

    /// 注册表统计信息
    fn stats(&self) -> RegistryStats;
}

/// 注册表统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// 已注册组件数量
    pub registered_components: usize,
    /// 已解析组件数量
    pub resolved_components: usize,
    /// 组件生命周期执行次数
    pub executions: u64,
    /// 解析错误数量
    pub resolution_errors: u64,
}

/// 依赖图节点
#[derive(Debug, Clone)]
pub struct DependencyGraphNode {
    /// 组件名称
    pub name: String,
    /// 依赖的组件名称
    pub requirements: Vec<String>,
}

impl<C> From<&ComponentDefinition<C>> for DependencyGraphNode {
    fn from(definition: &ComponentDefinition<C>) -> Self {
        Self {
            name: definition.name().to_string(),
            requirements: definition.requirements().to_vec(),
        }
    }
}

/// 依赖图检查器
///
/// 在解析之前静态检查组件定义，报告缺失的依赖和依赖环。
pub trait CircularDependencyDetector: Send + Sync {
    /// 检查依赖图，返回发现的全部问题
    fn validate(&self, graph: &[DependencyGraphNode]) -> Result<(), Vec<RegistryError>>;
}

/// 默认依赖图检查器，基于深度优先搜索
#[derive(Debug, Default)]
pub struct DefaultCircularDependencyDetector;

impl CircularDependencyDetector for DefaultCircularDependencyDetector {
    fn validate(&self, graph: &[DependencyGraphNode]) -> Result<(), Vec<RegistryError>> {
        let nodes: HashMap<&str, &DependencyGraphNode> =
            graph.iter().map(|node| (node.name.as_str(), node)).collect();
        let mut errors = Vec::new();

        let mut sorted: Vec<&DependencyGraphNode> = graph.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        for node in &sorted {
            for requirement in &node.requirements {
                if !nodes.contains_key(requirement.as_str()) {
                    errors.push(RegistryError::definition_not_found(
                        requirement.clone(),
                        nodes.keys().map(|name| name.to_string()).collect(),
                    ));
                }
            }
        }

        let mut visited = HashSet::new();
        let mut path = Vec::new();
        for node in &sorted {
            Self::dfs_check(node.name.as_str(), &nodes, &mut visited, &mut path, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl DefaultCircularDependencyDetector {
    fn dfs_check<'g>(
        current: &'g str,
        nodes: &HashMap<&'g str, &'g DependencyGraphNode>,
        visited: &mut HashSet<&'g str>,
        path: &mut Vec<&'g str>,
        errors: &mut Vec<RegistryError>,
    ) {
        if let Some(start) = path.iter().position(|name| *name == current) {
            let mut cycle = path[start..].to_vec();
            cycle.push(current);
            errors.push(RegistryError::CircularDependency {
                chain: cycle.join(" -> "),
            });
            return;
        }

        if !visited.insert(current) {
            return;
        }

        let Some(&node) = nodes.get(current) else {
            return;
        };

        path.push(current);
        for requirement in &node.requirements {
            Self::dfs_check(requirement.as_str(), nodes, visited, path, errors);
        }
        path.pop();
    }
}
