//! 启动配置
//!
//! 注册表本身不解释配置内容，只把它原样传递给每个组件钩子。

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 启动配置
///
/// 以 JSON 值树保存的不透明配置，通过点分路径访问。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    data: Value,
}

impl Configuration {
    /// 创建空配置
    pub fn new() -> Self {
        Self {
            data: Value::Object(serde_json::Map::new()),
        }
    }

    /// 从 JSON 值创建配置
    pub fn from_value(data: Value) -> Self {
        Self { data }
    }

    /// 获取底层 JSON 值
    pub fn as_value(&self) -> &Value {
        &self.data
    }

    /// 获取配置项，路径使用 `.` 分隔，如 `db.host`
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.data);
        }
        path.split('.')
            .try_fold(&self.data, |node, segment| node.get(segment))
    }

    /// 是否存在配置项
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// 绑定到具体类型
    pub fn bind<T>(&self, path: &str) -> Result<T, ConfigError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self.get(path).ok_or_else(|| ConfigError::KeyNotFound {
            key: path.to_string(),
        })?;

        T::deserialize(value).map_err(|source| ConfigError::Bind {
            key: path.to_string(),
            source,
        })
    }

    /// 插入配置项，缺失的中间节点会被创建
    pub fn insert(&mut self, path: &str, value: Value) {
        let mut node = &mut self.data;
        for segment in path.split('.') {
            if !node.is_object() {
                *node = Value::Object(serde_json::Map::new());
            }
            let Value::Object(map) = node else {
                unreachable!("节点已被替换为对象");
            };
            node = map.entry(segment.to_string()).or_insert(Value::Null);
        }
        *node = value;
    }

    /// 合并另一层配置，对象逐键递归合并，其余值直接覆盖
    pub fn merge(&mut self, layer: Value) {
        merge_value(&mut self.data, layer);
    }
}

fn merge_value(target: &mut Value, layer: Value) {
    match (target, layer) {
        (Value::Object(target), Value::Object(layer)) => {
            for (key, value) in layer {
                match target.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, layer) => *target = layer,
    }
}

impl From<Value> for Configuration {
    fn from(data: Value) -> Self {
        Self::from_value(data)
    }
}
