//! # model：模型聚合与生命周期
//!
//! ## 核心意图（Why）
//! - `Model` 聚合两条状态轴（[`Mode`]、[`LifecycleState`]）、父子系统引用、三个发布槽
//!   （子系统快照、选项、数据集）与分发表；
//! - 生命周期操作见 `lifecycle`，数据集管线见 `pipeline`，其余扩展点见 `extension`。
//!
//! ## 行为契约（What）
//! - 任一时刻读者恰好看到一个选项值与一个数据集值（可能为空）；
//! - 失败的转换既不修改生命周期阶段，也不向任何槽发布；钩子错误原样返回；
//! - `create` 之前的操作返回 `InvalidArgument`，拆卸开始之后的操作返回 `Unsupported`。
//!
//! ## 风险提示（Trade-offs）
//! - 选项槽与数据集槽独立更新，不提供跨槽事务；
//! - `destroy` 持有栅栏写侧期间运行的钩子不得回调同一模型的普通操作。

use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::{ModelConfig, SlotConfig, UNKNOWN_MODEL_NAME, UNKNOWN_SUBSYSTEM_NAME};
use crate::error::{ModelError, Result};
use crate::ops::{OperationTable, OperationsRef, PublishedDataset};
use crate::registry::{InMemoryRegistry, ParentHandle, RegistrationHandle, Registry};
use crate::slot::{ConcurrentSlot, SlotReadGuard};
use crate::types::{ModelOptions, Subsystem, SubsystemState};

mod extension;
pub(crate) mod fence;
mod lifecycle;
mod pipeline;
pub(crate) mod state;

use fence::{LifecycleFence, LifecycleReadGuard};
pub use state::{LifecycleState, Mode};
use state::{AtomicLifecycleState, AtomicMode};

/// 挂载在宿主子系统上的可替换决策模型。
///
/// # 教案式说明
/// - **意图 (Why)**：宿主只持有 `Model`，所有能力缺失都在内部降级，调用方无需判空；
/// - **逻辑 (How)**：读路径（[`options`](Self::options)、[`dataset`](Self::dataset)、
///   [`system_state`](Self::system_state)）直接读取发布槽，不经过栅栏；
///   写路径（生命周期、管线、扩展点）先进入生命周期栅栏再校验阶段；
/// - **契约 (What)**：`Model: Send + Sync`，可被 `Arc` 共享到任意线程。
pub struct Model {
    subsystem_name: Arc<str>,
    model_name: Arc<str>,
    parent_handle: ParentHandle,
    mode: AtomicMode,
    state: AtomicLifecycleState,
    parent: Arc<Subsystem>,
    parent_state: ConcurrentSlot<SubsystemState>,
    options: ConcurrentSlot<ModelOptions>,
    dataset: ConcurrentSlot<PublishedDataset>,
    operations: OperationsRef,
    registry: Arc<dyn Registry>,
    registration: Mutex<Option<RegistrationHandle>>,
    fence: LifecycleFence,
}

impl Model {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    /// 以配置构造模型，分发表使用通用表。
    pub fn from_config(config: &ModelConfig) -> Self {
        ModelBuilder::from_config(config).build()
    }

    pub fn subsystem_name(&self) -> &str {
        &self.subsystem_name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn parent_handle(&self) -> &ParentHandle {
        &self.parent_handle
    }

    /// 父子系统对象。
    pub fn parent(&self) -> &Subsystem {
        &self.parent
    }

    pub fn mode(&self) -> Mode {
        self.mode.load()
    }

    /// 切换信任模式；模式轴与生命周期阶段独立，任何阶段都可切换。
    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode);
    }

    pub fn state(&self) -> LifecycleState {
        self.state.load()
    }

    /// 当前发布的选项。
    pub fn options(&self) -> SlotReadGuard<ModelOptions> {
        self.options.read()
    }

    /// 当前发布的数据集。
    pub fn dataset(&self) -> SlotReadGuard<PublishedDataset> {
        self.dataset.read()
    }

    /// 最近一次刷新的子系统快照。
    pub fn system_state(&self) -> SlotReadGuard<SubsystemState> {
        self.parent_state.read()
    }

    /// 当前数据集的共享引用，可跨越后续发布持有。
    pub fn dataset_snapshot(&self) -> Option<Arc<PublishedDataset>> {
        self.dataset.snapshot()
    }

    /// 数据集槽已完成的发布次数。
    pub fn dataset_generation(&self) -> u64 {
        self.dataset.generation()
    }

    /// 选项槽已完成的发布次数。
    pub fn options_generation(&self) -> u64 {
        self.options.generation()
    }

    /// 分发表。
    pub fn operations(&self) -> &OperationTable {
        &self.operations
    }

    /// 是否使用进程级通用分发表。
    pub fn uses_generic_operations(&self) -> bool {
        self.operations.is_generic()
    }

    /// 当前的挂载凭据；`create` 之前与 `destroy` 之后为 `None`。
    pub fn registration(&self) -> Option<RegistrationHandle> {
        self.registration.lock().clone()
    }

    /// 进入共享栅栏并校验阶段。
    fn enter(&self, operation: &'static str) -> Result<LifecycleReadGuard<'_>> {
        let Some(guard) = self.fence.try_enter() else {
            debug!(model = %self.model_name, operation, "destroy in progress; operation rejected");
            return Err(ModelError::unsupported(operation));
        };
        match self.state() {
            LifecycleState::Unknown => Err(ModelError::invalid_argument(format!(
                "model `{}` must be created before `{operation}`",
                self.model_name
            ))),
            state if state.is_tearing_down() => Err(ModelError::unsupported(operation)),
            _ => Ok(guard),
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("subsystem_name", &self.subsystem_name)
            .field("model_name", &self.model_name)
            .field("parent", &self.parent_handle)
            .field("mode", &self.mode())
            .field("state", &self.state())
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        if let Some(handle) = self.registration.get_mut().take() {
            warn!(
                model = %self.model_name,
                path = handle.path(),
                "model dropped without destroy; releasing registration"
            );
            self.registry.deregister(handle);
        }
    }
}

/// `Model` 构建器。
///
/// 缺省值：子系统名 `unknown_subsystem`、模型名 `unknown_model`、父节点为根、
/// 通用分发表、独立的内存注册表、新分配的父子系统对象。
#[must_use]
pub struct ModelBuilder {
    subsystem_name: Arc<str>,
    model_name: Arc<str>,
    parent_handle: ParentHandle,
    parent: Option<Arc<Subsystem>>,
    operations: OperationsRef,
    registry: Option<Arc<dyn Registry>>,
    slots: SlotConfig,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self {
            subsystem_name: Arc::from(UNKNOWN_SUBSYSTEM_NAME),
            model_name: Arc::from(UNKNOWN_MODEL_NAME),
            parent_handle: ParentHandle::root(),
            parent: None,
            operations: OperationsRef::generic(),
            registry: None,
            slots: SlotConfig::default(),
        }
    }

    /// 从配置回填名称、父节点与槽参数。
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new()
            .subsystem_name(config.subsystem_name.clone())
            .model_name(config.model_name.clone())
            .parent_handle(config.parent_handle())
            .slot_config(config.slots)
    }

    pub fn subsystem_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.subsystem_name = name.into();
        self
    }

    pub fn model_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn parent_handle(mut self, parent: ParentHandle) -> Self {
        self.parent_handle = parent;
        self
    }

    /// 共享已有的父子系统对象。
    pub fn parent(mut self, parent: Arc<Subsystem>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 挂载子系统自带的分发表。
    pub fn operations(self, table: OperationTable) -> Self {
        self.shared_operations(Arc::new(table))
    }

    /// 挂载与其他模型共享的分发表。
    pub fn shared_operations(mut self, table: Arc<OperationTable>) -> Self {
        self.operations = OperationsRef::Attached(table);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn slot_config(mut self, slots: SlotConfig) -> Self {
        self.slots = slots;
        self
    }

    /// 构造处于 `Unknown` 阶段的模型；选项槽与数据集槽为空。
    pub fn build(self) -> Model {
        Model {
            subsystem_name: self.subsystem_name,
            model_name: self.model_name,
            parent_handle: self.parent_handle,
            mode: AtomicMode::new(Mode::Unknown),
            state: AtomicLifecycleState::new(LifecycleState::Unknown),
            parent: self.parent.unwrap_or_default(),
            parent_state: ConcurrentSlot::with_config(self.slots),
            options: ConcurrentSlot::with_config(self.slots),
            dataset: ConcurrentSlot::with_config(self.slots),
            operations: self.operations,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(InMemoryRegistry::new())),
            registration: Mutex::new(None),
            fence: LifecycleFence::new(),
        }
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
