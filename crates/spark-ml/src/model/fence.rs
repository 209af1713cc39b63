//! 生命周期栅栏。

use core::fmt;

#[cfg(any(loom, spark_loom))]
use std::sync::PoisonError;

#[cfg(any(loom, spark_loom))]
use loom::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
#[cfg(not(any(loom, spark_loom)))]
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 普通操作共享、`destroy` 独占的读写栅栏。
///
/// # 教案级注释（Why）
/// - `destroy` 必须等待在途操作全部完成，且之后不得有任何操作越过它；
/// - 普通操作进入读侧，彼此并发；`destroy` 进入写侧。写侧被持有期间，
///   新的操作不排队，直接得到 `None`，由调用方转成 `Unsupported`。
///
/// # 契约说明（What）
/// - [`try_enter`](Self::try_enter) 只在写侧被持有时失败，排队中的写者不会让它失败，
///   因此钩子内部再次调用同一模型的普通操作不会自锁；
/// - `destroy` 期间运行的钩子调用同一模型的普通操作同样走 `try_enter`，立即失败而不是死锁；
/// - 启用 `--cfg spark_loom` 时底层换成 Loom 的读写锁，模型检查直接驱动本类型。
pub struct LifecycleFence {
    lock: RwLock<()>,
}

impl LifecycleFence {
    pub fn new() -> Self {
        Self {
            lock: RwLock::new(()),
        }
    }

    /// 尝试进入共享侧；写侧被持有时返回 `None`。
    #[cfg(not(any(loom, spark_loom)))]
    pub fn try_enter(&self) -> Option<LifecycleReadGuard<'_>> {
        self.lock
            .try_read_recursive()
            .map(|guard| LifecycleReadGuard { _guard: guard })
    }

    /// 尝试进入共享侧；写侧被持有时返回 `None`。
    #[cfg(any(loom, spark_loom))]
    pub fn try_enter(&self) -> Option<LifecycleReadGuard<'_>> {
        self.lock
            .try_read()
            .ok()
            .map(|guard| LifecycleReadGuard { _guard: guard })
    }

    /// 进入独占侧，等待所有共享侧守卫释放。
    pub fn exclusive(&self) -> LifecycleWriteGuard<'_> {
        #[cfg(not(any(loom, spark_loom)))]
        let guard = self.lock.write();
        #[cfg(any(loom, spark_loom))]
        let guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        LifecycleWriteGuard { _guard: guard }
    }
}

impl Default for LifecycleFence {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleFence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleFence").finish_non_exhaustive()
    }
}

/// 共享侧守卫。
pub struct LifecycleReadGuard<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

/// 独占侧守卫。
pub struct LifecycleWriteGuard<'a> {
    _guard: RwLockWriteGuard<'a, ()>,
}
