//! # registry：模型挂载注册表
//!
//! ## 核心意图（Why）
//! - 模型在 `create` 时向父节点登记自身名称，在 `destroy` 时注销；注册表只关心“名字是否被占用”，
//!   呈现方式（属性树、控制文件等）属于实现方；
//! - 以 trait 暴露最小契约，宿主可以接入自己的属性树，测试可以注入故障。
//!
//! ## 行为契约（What）
//! - `register`：同一父节点下名称唯一，冲突或空名称返回 `RegistrationFailure`；
//! - `deregister`：只移除与句柄编号匹配的条目，重复注销为空操作。
//!
//! ## 风险提示（Trade-offs）
//! - 内存注册表不维护父节点之间的层级关系，路径只是 `<parent>/<model>` 的拼接键。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use crate::error::{ModelError, Result};

/// 父节点句柄。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParentHandle(Arc<str>);

impl ParentHandle {
    /// 根节点名称。
    pub const ROOT_NAME: &'static str = "root";

    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// 根节点句柄。
    pub fn root() -> Self {
        Self::new(Self::ROOT_NAME)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for ParentHandle {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for ParentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次成功登记的凭据，由 `destroy` 交还给注册表。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
    path: Arc<str>,
    id: u64,
}

impl RegistrationHandle {
    pub fn new(path: impl Into<Arc<str>>, id: u64) -> Self {
        Self {
            path: path.into(),
            id,
        }
    }

    /// 登记路径，形如 `<parent>/<model>`。
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// 挂载协作者。
///
/// # 教案式注释
/// - **意图 (Why)**：把“登记到父节点”抽象为可替换的协作者，核心只在 `create`/`destroy` 调用；
/// - **契约 (What)**：
///   - `register` 失败必须返回 `RegistrationFailure`，且不得留下任何登记；
///   - `deregister` 不会失败，未知句柄静默忽略；
/// - **风险 (Trade-offs)**：实现需满足 `Send + Sync`，因为模型可能在任意线程被销毁。
pub trait Registry: Send + Sync {
    fn register(&self, model_name: &str, parent: &ParentHandle) -> Result<RegistrationHandle>;

    fn deregister(&self, handle: RegistrationHandle);
}

/// 基于 `DashMap` 的内存注册表。
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: DashMap<Arc<str>, u64>,
    next_id: AtomicU64,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 路径是否已被登记。
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn path_of(model_name: &str, parent: &ParentHandle) -> Arc<str> {
        Arc::from(format!("{}/{}", parent.name(), model_name))
    }
}

impl Registry for InMemoryRegistry {
    fn register(&self, model_name: &str, parent: &ParentHandle) -> Result<RegistrationHandle> {
        if model_name.trim().is_empty() {
            return Err(ModelError::registration_failure(
                model_name.to_owned(),
                "model name must not be empty",
            ));
        }
        let path = Self::path_of(model_name, parent);
        match self.entries.entry(Arc::clone(&path)) {
            Entry::Occupied(_) => Err(ModelError::registration_failure(
                model_name.to_owned(),
                format!("`{path}` is already registered"),
            )),
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                vacant.insert(id);
                debug!(path = %path, id, "model registered");
                Ok(RegistrationHandle::new(path, id))
            }
        }
    }

    fn deregister(&self, handle: RegistrationHandle) {
        let removed = self
            .entries
            .remove_if(handle.path(), |_, id| *id == handle.id())
            .is_some();
        debug!(path = handle.path(), removed, "model deregistered");
    }
}
