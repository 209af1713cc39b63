//! 单写多读的发布槽（`ConcurrentSlot`）。
//!
//! # 设计初衷（Why）
//! - 模型的选项与数据集需要在读者持续运行时整体替换：读路径不得阻塞，也不得观察到半构造的值；
//! - 读路径复用社区成熟的 [`arc-swap`](https://crates.io/crates/arc-swap)，`load` 为锁自由操作；
//! - 写路径额外持有每槽独立的互斥区，保证“读取当前值 → 构造替换值 → 发布”在写者之间串行。
//!
//! # 使用方式（How）
//! 1. 写者在调用前完整构造新值，随后 [`ConcurrentSlot::publish`]，拿回被替换的旧值；
//! 2. 写者对旧值调用 [`ConcurrentSlot::reclaim`]：等待静默屏障，直到交换之前开始的读者全部离开；
//! 3. 读者通过 [`ConcurrentSlot::read`] 取得守卫，在守卫存活期间引用保持稳定。
//!
//! # 契约说明（What）
//! - 读者只会看到完整的旧值或完整的新值，不会混合两代字段；
//! - “不再发布”与“可以销毁”分离：`publish` 只摘除引用，`reclaim` 才交出独占所有权；
//! - 槽本身没有失败路径，错误只属于发布之前的构造步骤。
//!
//! # 权衡与注意事项（Trade-offs）
//! - 静默屏障以让出调度的自旋实现，上限由 [`SlotConfig::grace_spins`] 约束；
//! - 若旧值被长生命周期快照（[`ConcurrentSlot::snapshot`]）钉住，超出预算后放弃独占，
//!   内存由最后一个持有者释放，调用方的拆卸钩子不会执行。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use arc_swap::{ArcSwapOption, Guard};
use parking_lot::Mutex;
use tracing::warn;

use crate::config::SlotConfig;

/// 发布槽。
///
/// - **意图（Why）**：作为所有可热替换状态的地基；
/// - **逻辑（How）**：`ArcSwapOption<T>` 保存当前快照，`writer` 串行化写者，`generation` 记录发布次数；
/// - **契约（What）**：`T` 一经发布即不可变，需要修改时构造新值再次发布。
pub struct ConcurrentSlot<T> {
    current: ArcSwapOption<T>,
    writer: Mutex<()>,
    generation: AtomicU64,
    grace_spins: u32,
}

impl<T> ConcurrentSlot<T> {
    /// 构造空槽。
    pub fn empty() -> Self {
        Self::with_config(SlotConfig::default())
    }

    /// 以初始值构造槽，初始发布计为第 1 代。
    pub fn new(value: T) -> Self {
        let slot = Self::empty();
        slot.current.store(Some(Arc::new(value)));
        slot.generation.store(1, Ordering::Release);
        slot
    }

    /// 按配置构造空槽。
    pub fn with_config(config: SlotConfig) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
            grace_spins: config.grace_spins,
        }
    }

    /// 读取调用时刻发布的值。
    ///
    /// - **实现逻辑**：`ArcSwapOption::load` 为锁自由路径，守卫持有期间引用稳定；
    /// - **注意事项**：守卫应短暂持有，长期持有请改用 [`snapshot`](Self::snapshot)。
    pub fn read(&self) -> SlotReadGuard<T> {
        SlotReadGuard {
            inner: self.current.load(),
        }
    }

    /// 以共享所有权取得当前值，可跨越后续写入长期持有。
    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.current.load_full()
    }

    /// 当前是否未发布任何值。
    pub fn is_empty(&self) -> bool {
        self.current.load().is_none()
    }

    /// 已完成的发布次数（包含清空）。
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// 发布完整构造的新值，返回被替换的旧值。
    pub fn publish(&self, value: T) -> Option<Arc<T>> {
        self.replace(Some(Arc::new(value)))
    }

    /// 发布已包装为共享引用的值；调用方可保留一份引用作为发布结果返回给读者。
    pub fn publish_shared(&self, value: Arc<T>) -> Option<Arc<T>> {
        self.replace(Some(value))
    }

    /// 发布“空”，返回被替换的旧值。
    pub fn clear(&self) -> Option<Arc<T>> {
        self.replace(None)
    }

    /// 在写者互斥区内基于当前值派生替换值并发布。
    ///
    /// - **输入参数**：`build` 接收当前发布值（可能为空），返回完整的新值；
    /// - **前置条件**：`build` 不得再次写入同一槽，否则会在写者互斥区上自锁；
    /// - **后置条件**：派生与发布之间不会有其他写者插入，返回被替换的旧值。
    pub fn publish_with<F>(&self, build: F) -> Option<Arc<T>>
    where
        F: FnOnce(Option<&T>) -> T,
    {
        let _writer = self.writer.lock();
        let next = {
            let current = self.current.load();
            build(current.as_deref())
        };
        self.swap_locked(Some(Arc::new(next)))
    }

    /// 等待静默屏障后交出旧值的独占所有权。
    ///
    /// - **实现逻辑**：`arc-swap` 在交换时已把未偿还的读者债务折算为真实引用计数，
    ///   因此 `Arc::try_unwrap` 成功即意味着交换之前开始的读者全部离开；
    /// - **返回值**：成功取得独占返回 `Some(T)`；超出自旋预算时返回 `None`，
    ///   值交由剩余持有者在释放时回收。
    pub fn reclaim(&self, old: Arc<T>) -> Option<T> {
        let mut pending = old;
        let mut spins = 0u32;
        loop {
            match Arc::try_unwrap(pending) {
                Ok(value) => return Some(value),
                Err(still_shared) => {
                    if spins >= self.grace_spins {
                        warn!(
                            holders = Arc::strong_count(&still_shared) - 1,
                            spins, "grace period exhausted; superseded value left to its holders"
                        );
                        return None;
                    }
                    pending = still_shared;
                    spins += 1;
                    thread::yield_now();
                }
            }
        }
    }

    fn replace(&self, next: Option<Arc<T>>) -> Option<Arc<T>> {
        let _writer = self.writer.lock();
        self.swap_locked(next)
    }

    fn swap_locked(&self, next: Option<Arc<T>>) -> Option<Arc<T>> {
        let old = self.current.swap(next);
        self.generation.fetch_add(1, Ordering::AcqRel);
        old
    }
}

impl<T> Default for ConcurrentSlot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for ConcurrentSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentSlot")
            .field("current", &self.read().get())
            .field("generation", &self.generation())
            .finish()
    }
}

/// 读守卫，持有期间引用保持稳定。
pub struct SlotReadGuard<T> {
    inner: Guard<Option<Arc<T>>>,
}

impl<T> SlotReadGuard<T> {
    /// 发布值的只读引用；槽为空时返回 `None`。
    pub fn get(&self) -> Option<&T> {
        self.inner.as_deref()
    }

    /// 读取时刻槽是否为空。
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// 升级为共享所有权，脱离守卫生命周期。
    pub fn to_shared(&self) -> Option<Arc<T>> {
        self.inner.as_ref().map(Arc::clone)
    }
}

impl<T: fmt::Debug> fmt::Debug for SlotReadGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SlotReadGuard").field(&self.get()).finish()
    }
}
