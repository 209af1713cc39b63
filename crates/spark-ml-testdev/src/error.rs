//! 测试设备错误域。
//!
//! 设备自身只有两类失败：写入越过缓冲区容量，以及控制请求参数非法；
//! 其余失败来自挂载的模型，原样包裹为 [`DeviceError::Model`]。

use spark_ml::ModelError;
use thiserror::Error;

/// 设备层 `Result` 别名。
pub type Result<T, E = DeviceError> = core::result::Result<T, E>;

/// 测试设备错误。
///
/// # 教案式说明
/// - **意图 (Why)**：把字符设备的 `ENOSPC`/`EINVAL` 语义映射为可匹配的枚举；
/// - **契约 (What)**：模型错误经 `From` 自动转换，`?` 即可向上传播。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum DeviceError {
    /// 写入位置不小于缓冲区容量。
    #[error("no space left: position {position} is beyond the {capacity} byte buffer")]
    NoSpace { position: usize, capacity: usize },

    /// 控制请求携带的参数越界。
    #[error("invalid argument: {detail}")]
    InvalidArgument { detail: String },

    /// 挂载模型返回的错误。
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl DeviceError {
    /// 稳定错误码；模型错误沿用模型侧错误码。
    pub fn code(&self) -> &'static str {
        match self {
            DeviceError::NoSpace { .. } => "device.no_space",
            DeviceError::InvalidArgument { .. } => "device.invalid_argument",
            DeviceError::Model(inner) => inner.code(),
        }
    }
}
