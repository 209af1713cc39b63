//! # ops：扩展点分发
//!
//! ## 核心意图（Why）
//! - 挂载模型的一方只需实现自己关心的扩展点，其余扩展点各自独立回落：
//!   子系统覆写 → 通用默认实现 → `Unsupported`；
//! - 通用分发表是进程级共享的不可变 `static`，以引用传递；子系统自带的分发表以 `Arc` 共享。
//!
//! ## 结构（How）
//! - [`ExtensionPoint`]：17 个扩展点的名称枚举，用于错误信息、日志字段与测试遍历；
//! - [`OperationTable`]：可选闭包组成的覆写表，附带数据集对象钩子 [`DatasetOperations`]；
//! - [`GenericOperations`]：通用默认实现，只有 create/init/re_init/destroy/get_dataset 不拒绝。

use core::fmt;

mod dataset;
mod generic;
mod table;

pub use dataset::{
    DatasetAllocateHook, DatasetDestroyHook, DatasetInitHook, DatasetOperations, PublishedDataset,
};
pub use generic::GenericOperations;
pub use table::{
    BackpropagationHook, DatasetHook, DestroyHook, ExtractHook, ModelHook, OperationHook,
    OperationTable, OperationTableBuilder, OptionsHook, PublishHook, RecommendationHook,
    StartHook, SystemStateHook,
};
pub(crate) use table::OperationsRef;

/// 扩展点名称。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExtensionPoint {
    Create,
    Init,
    ReInit,
    Start,
    Stop,
    Destroy,
    GetSystemState,
    GetDataset,
    PreprocessData,
    PublishData,
    PreprocessRecommendation,
    EstimateSystemState,
    ApplyRecommendation,
    ExecuteOperation,
    EstimateEfficiency,
    ErrorBackpropagation,
    CorrectSystemState,
}

impl ExtensionPoint {
    /// 全部扩展点，按声明顺序排列。
    pub const ALL: [ExtensionPoint; 17] = [
        ExtensionPoint::Create,
        ExtensionPoint::Init,
        ExtensionPoint::ReInit,
        ExtensionPoint::Start,
        ExtensionPoint::Stop,
        ExtensionPoint::Destroy,
        ExtensionPoint::GetSystemState,
        ExtensionPoint::GetDataset,
        ExtensionPoint::PreprocessData,
        ExtensionPoint::PublishData,
        ExtensionPoint::PreprocessRecommendation,
        ExtensionPoint::EstimateSystemState,
        ExtensionPoint::ApplyRecommendation,
        ExtensionPoint::ExecuteOperation,
        ExtensionPoint::EstimateEfficiency,
        ExtensionPoint::ErrorBackpropagation,
        ExtensionPoint::CorrectSystemState,
    ];

    /// 蛇形命名的扩展点名称。
    pub const fn as_str(self) -> &'static str {
        match self {
            ExtensionPoint::Create => "create",
            ExtensionPoint::Init => "init",
            ExtensionPoint::ReInit => "re_init",
            ExtensionPoint::Start => "start",
            ExtensionPoint::Stop => "stop",
            ExtensionPoint::Destroy => "destroy",
            ExtensionPoint::GetSystemState => "get_system_state",
            ExtensionPoint::GetDataset => "get_dataset",
            ExtensionPoint::PreprocessData => "preprocess_data",
            ExtensionPoint::PublishData => "publish_data",
            ExtensionPoint::PreprocessRecommendation => "preprocess_recommendation",
            ExtensionPoint::EstimateSystemState => "estimate_system_state",
            ExtensionPoint::ApplyRecommendation => "apply_recommendation",
            ExtensionPoint::ExecuteOperation => "execute_operation",
            ExtensionPoint::EstimateEfficiency => "estimate_efficiency",
            ExtensionPoint::ErrorBackpropagation => "error_backpropagation",
            ExtensionPoint::CorrectSystemState => "correct_system_state",
        }
    }

    /// 通用默认实现是否拒绝该扩展点。
    pub const fn declined_by_default(self) -> bool {
        !matches!(
            self,
            ExtensionPoint::Create
                | ExtensionPoint::Init
                | ExtensionPoint::ReInit
                | ExtensionPoint::Destroy
                | ExtensionPoint::GetDataset
        )
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
