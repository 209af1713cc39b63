//! 可被 Loom 替换的同步原语。
//
// 教案级说明：启用 `--cfg loom` 或 `--cfg spark_loom` 时切换到 Loom 提供的原子类型，
// 使模型检查能够穷举阶段单元上的全部调度交错；常规构建使用标准库实现。

#[cfg(not(any(loom, spark_loom)))]
pub(crate) use std::sync::atomic::{AtomicU8, Ordering};

#[cfg(any(loom, spark_loom))]
pub(crate) use loom::sync::atomic::{AtomicU8, Ordering};
