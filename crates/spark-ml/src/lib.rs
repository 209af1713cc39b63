#![deny(unsafe_code)]
#![doc = "spark-ml: 可热替换决策模型的宿主核心。"]
#![doc = ""]
#![doc = "== 核心组成 =="]
#![doc = "1. `slot::ConcurrentSlot`：单写多读的发布槽，读路径无锁，旧值在静默屏障后回收。"]
#![doc = "2. `ops::OperationTable`：扩展点两级分发（子系统覆写 → 通用默认 → Unsupported）。"]
#![doc = "3. `model::Model`：生命周期状态机（create → init → start/stop → destroy）与数据集管线。"]
#![doc = ""]
#![doc = "== 外部协作者 =="]
#![doc = "注册树（`registry`）、控制通道（`control`）与内存分配（`alloc`）仅以最小契约出现，"]
#![doc = "具体呈现方式与学习算法均由挂载模型的一方提供。"]

mod macros;
mod sync;

pub mod alloc;
pub mod config;
pub mod control;
pub mod error;
pub mod model;
pub mod ops;
pub mod registry;
pub mod slot;
pub mod types;

/// 供 Loom 模型检查直接驱动的内部同步构件，仅在 `--cfg spark_loom`（或 `--cfg loom`）下导出。
#[cfg(any(loom, spark_loom))]
#[doc(hidden)]
pub mod loom_support {
    pub use crate::model::fence::{LifecycleFence, LifecycleReadGuard, LifecycleWriteGuard};
    pub use crate::model::state::AtomicLifecycleState;
}

pub use config::{ModelConfig, OptionsConfig, SlotConfig};
pub use control::{ControlChannel, ControlCommand};
pub use error::{ModelError, Result};
pub use model::{LifecycleState, Mode, Model, ModelBuilder};
pub use ops::{
    ExtensionPoint, GenericOperations, OperationTable, OperationTableBuilder, PublishedDataset,
};
pub use registry::{InMemoryRegistry, ParentHandle, RegistrationHandle, Registry};
pub use slot::{ConcurrentSlot, SlotReadGuard};
pub use types::{
    BackpropagationFeedback, Dataset, DatasetKind, DatasetState, ModelOptions, Notification,
    Portion, Recommendation, RequestConfig, RequestConfigKind, RequestConfigState, RunConfig,
    Subsystem, SubsystemKind, SubsystemPhase, SubsystemState, UserRequest,
};
