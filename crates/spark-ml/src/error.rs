//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义模型宿主对外暴露的全部失败语义，生命周期、分发与数据集管线共用同一错误域；
//! - 钩子返回的错误按原样向调用方传播，核心不做改写、不做吞并、也不做自动重试。
//!
//! ## 设计要求（What）
//! - 六类错误：`InvalidArgument`、`OutOfMemory`、`Unsupported`、`ExtractionFailure`、`Corrupted`、
//!   `RegistrationFailure`；
//! - 每个变体携带可读上下文，并通过 [`ModelError::code`] 暴露稳定的点分错误码，便于告警聚合。

use std::borrow::Cow;

use thiserror::Error;

use crate::ops::ExtensionPoint;

/// crate 统一的 `Result` 别名。
pub type Result<T, E = ModelError> = core::result::Result<T, E>;

/// 模型宿主错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：以细粒度枚举区分“参数错误”“能力缺失”“数据集抽取失败”等路径，
///   让宿主能够按类别决定降级或重试策略；
/// - **契约 (What)**：
///   - 所有变体满足 `Send + Sync + 'static`，可安全跨线程传播；
///   - `Clone + PartialEq`，便于测试直接比较钩子原样返回的错误；
/// - **设计权衡 (Trade-offs)**：上下文使用 `Cow<'static, str>`，静态描述零分配，动态描述才分配。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ModelError {
    /// 缺失必需参数或分配请求小于结构最小尺寸。
    #[error("invalid argument: {detail}")]
    InvalidArgument { detail: Cow<'static, str> },

    /// 分配器无法满足请求。
    #[error("out of memory: {detail}")]
    OutOfMemory { detail: Cow<'static, str> },

    /// 既无子系统覆写、也无可用通用默认实现。
    #[error("operation `{operation}` is not supported")]
    Unsupported { operation: Cow<'static, str> },

    /// 抽取钩子失败；此前发布的数据集保持不变。
    #[error("dataset extraction failed: {detail}")]
    ExtractionFailure { detail: Cow<'static, str> },

    /// 数据集未通过校验，不会自动重试。
    #[error("dataset corrupted: {detail}")]
    Corrupted { detail: Cow<'static, str> },

    /// 与父子系统的挂载/卸载失败。
    #[error("registration of `{name}` failed: {detail}")]
    RegistrationFailure {
        name: Cow<'static, str>,
        detail: Cow<'static, str>,
    },
}

impl ModelError {
    /// 构造 `InvalidArgument`。
    pub fn invalid_argument(detail: impl Into<Cow<'static, str>>) -> Self {
        ModelError::InvalidArgument {
            detail: detail.into(),
        }
    }

    /// 构造 `OutOfMemory`。
    pub fn out_of_memory(detail: impl Into<Cow<'static, str>>) -> Self {
        ModelError::OutOfMemory {
            detail: detail.into(),
        }
    }

    /// 构造 `Unsupported`，`operation` 为人类可读的操作名。
    pub fn unsupported(operation: impl Into<Cow<'static, str>>) -> Self {
        ModelError::Unsupported {
            operation: operation.into(),
        }
    }

    /// 以扩展点名称构造 `Unsupported`，供分发表的通用默认实现使用。
    pub fn unsupported_point(point: ExtensionPoint) -> Self {
        ModelError::unsupported(point.as_str())
    }

    /// 构造 `ExtractionFailure`。
    pub fn extraction_failure(detail: impl Into<Cow<'static, str>>) -> Self {
        ModelError::ExtractionFailure {
            detail: detail.into(),
        }
    }

    /// 构造 `Corrupted`。
    pub fn corrupted(detail: impl Into<Cow<'static, str>>) -> Self {
        ModelError::Corrupted {
            detail: detail.into(),
        }
    }

    /// 构造 `RegistrationFailure`。
    pub fn registration_failure(
        name: impl Into<Cow<'static, str>>,
        detail: impl Into<Cow<'static, str>>,
    ) -> Self {
        ModelError::RegistrationFailure {
            name: name.into(),
            detail: detail.into(),
        }
    }

    /// 稳定错误码。
    ///
    /// - **契约 (What)**：返回值在小版本之间保持不变，可直接作为指标标签或告警键；
    /// - **执行 (How)**：按变体映射到 `ml.*` 前缀的点分字符串。
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::InvalidArgument { .. } => "ml.invalid_argument",
            ModelError::OutOfMemory { .. } => "ml.out_of_memory",
            ModelError::Unsupported { .. } => "ml.unsupported",
            ModelError::ExtractionFailure { .. } => "ml.dataset.extraction_failure",
            ModelError::Corrupted { .. } => "ml.dataset.corrupted",
            ModelError::RegistrationFailure { .. } => "ml.registration_failure",
        }
    }

    /// 是否为“能力缺失”类错误。
    ///
    /// 宿主通常据此回落到自身默认算法，而不是把错误上抛给用户。
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ModelError::Unsupported { .. })
    }

    /// 错误是否与数据集内容相关（抽取失败或校验失败）。
    pub fn is_dataset_fault(&self) -> bool {
        matches!(
            self,
            ModelError::ExtractionFailure { .. } | ModelError::Corrupted { .. }
        )
    }
}
