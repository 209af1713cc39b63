//! 按最小尺寸校验的对象分配。
//!
//! 宿主以“请求字节数”描述分配：请求小于结构自身尺寸视为调用方错误，
//! 超出地址空间上限视为内存不足。分配得到的对象处于各类型定义的零值状态。

use std::any;
use std::mem;

use crate::error::{ModelError, Result};

/// 可按字节数分配的结构。
pub trait Footprint: Sized {
    /// 结构最小尺寸。
    const MIN_FOOTPRINT: usize = mem::size_of::<Self>();

    /// 构造零值对象，`size` 为已通过校验的请求字节数。
    fn zeroed(size: usize) -> Self;
}

/// 分配 `size` 字节的 `T`。
///
/// # 错误
/// - `size < T::MIN_FOOTPRINT`：`InvalidArgument`；
/// - `size > isize::MAX`：`OutOfMemory`。
pub fn allocate<T: Footprint>(size: usize) -> Result<T> {
    if size < T::MIN_FOOTPRINT {
        return Err(ModelError::invalid_argument(format!(
            "{size} bytes is below the {} byte footprint of {}",
            T::MIN_FOOTPRINT,
            any::type_name::<T>()
        )));
    }
    if size > isize::MAX as usize {
        return Err(ModelError::out_of_memory(format!(
            "{size} bytes exceeds the address space"
        )));
    }
    Ok(T::zeroed(size))
}

/// 以结构最小尺寸分配。
pub fn allocate_default<T: Footprint>() -> Result<T> {
    allocate(T::MIN_FOOTPRINT)
}

/// 释放对象；`None` 为空操作。
pub fn free<T>(value: Option<T>) {
    drop(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dataset, DatasetState, ModelOptions, Subsystem};

    #[test]
    fn undersized_request_is_invalid_argument() {
        let err = allocate::<Dataset>(0).expect_err("零字节请求应被拒绝");
        assert_eq!(err.code(), "ml.invalid_argument");
    }

    #[test]
    fn oversized_request_is_out_of_memory() {
        let err = allocate::<Dataset>(usize::MAX).expect_err("超出地址空间");
        assert_eq!(err.code(), "ml.out_of_memory");
    }

    #[test]
    fn fresh_objects_carry_allocation_defaults() {
        let options = allocate_default::<ModelOptions>().expect("分配选项");
        assert_eq!(options.sleep_timeout(), ModelOptions::NEVER_WAKE);

        let dataset = allocate_default::<Dataset>().expect("分配数据集");
        assert_eq!(dataset.state(), DatasetState::Allocated);

        let subsystem = allocate::<Subsystem>(4096).expect("分配子系统");
        assert_eq!(subsystem.size(), 4096);
        free(Some(subsystem));
        free::<Dataset>(None);
    }
}
