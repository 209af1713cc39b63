//! 数据集对象钩子。
//!
//! 与模型扩展点分开存放：这些钩子只作用于数据集对象本身（分配、初始化、拆卸），
//! 不接触模型状态。缺省行为与分配器一致：按最小尺寸分配、初始化为空操作、拆卸即释放。
//!
//! 已发布的数据集包装为 [`PublishedDataset`]，拆卸钩子在最后一个持有者释放时运行。

use std::fmt;
use std::mem;
use std::ops::Deref;
use std::sync::Arc;

use super::OperationsRef;
use crate::alloc::{self, Footprint};
use crate::error::Result;
use crate::types::Dataset;

/// 分配钩子，参数为请求字节数。
pub type DatasetAllocateHook = Arc<dyn Fn(usize) -> Result<Dataset> + Send + Sync>;
/// 初始化钩子，在抽取之前运行。
pub type DatasetInitHook = Arc<dyn Fn(&mut Dataset) -> Result<()> + Send + Sync>;
/// 拆卸钩子，接收独占所有权。
pub type DatasetDestroyHook = Arc<dyn Fn(Dataset) + Send + Sync>;

/// 数据集对象钩子表。
#[derive(Clone, Default)]
pub struct DatasetOperations {
    pub allocate: Option<DatasetAllocateHook>,
    pub init: Option<DatasetInitHook>,
    pub destroy: Option<DatasetDestroyHook>,
}

impl DatasetOperations {
    /// 不含任何钩子的表。
    pub const fn empty() -> Self {
        Self {
            allocate: None,
            init: None,
            destroy: None,
        }
    }

    pub(crate) fn allocate(&self) -> Result<Dataset> {
        match &self.allocate {
            Some(hook) => hook(Dataset::MIN_FOOTPRINT),
            None => alloc::allocate::<Dataset>(Dataset::MIN_FOOTPRINT),
        }
    }

    pub(crate) fn init(&self, dataset: &mut Dataset) -> Result<()> {
        match &self.init {
            Some(hook) => hook(dataset),
            None => Ok(()),
        }
    }

    pub(crate) fn destroy(&self, dataset: Dataset) {
        match &self.destroy {
            Some(hook) => hook(dataset),
            None => alloc::free(Some(dataset)),
        }
    }

    fn hooks(&self) -> [(&'static str, bool); 3] {
        [
            ("allocate", self.allocate.is_some()),
            ("init", self.init.is_some()),
            ("destroy", self.destroy.is_some()),
        ]
    }
}

impl fmt::Debug for DatasetOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overridden: Vec<_> = self
            .hooks()
            .into_iter()
            .filter_map(|(name, present)| present.then_some(name))
            .collect();
        f.debug_struct("DatasetOperations")
            .field("overridden", &overridden)
            .finish()
    }
}

/// 已发布到模型数据集槽中的数据集。
///
/// # 教案式说明
/// - **意图 (Why)**：`get_dataset` 把结果以共享引用交给调用方，调用方可以跨越后续的作废、
///   重新抽取乃至 `destroy` 继续持有；拆卸不能等调用方，也不能被跳过；
/// - **逻辑 (How)**：包装体记住发布时的分发表，`Drop` 时把内部数据集交给其数据集拆卸钩子；
///   因此“不再发布”与“可以拆卸”天然分离，拆卸发生在最后一个持有者（槽、读守卫或调用方）释放之时；
/// - **契约 (What)**：每个发布过的数据集恰好拆卸一次，且不早于任何读者离开；
///   拆卸钩子可能运行在释放最后一份引用的任意线程上。
pub struct PublishedDataset {
    dataset: Dataset,
    operations: OperationsRef,
}

impl PublishedDataset {
    pub(crate) fn new(dataset: Dataset, operations: OperationsRef) -> Self {
        Self {
            dataset,
            operations,
        }
    }

    /// 内部数据集。
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

impl Deref for PublishedDataset {
    type Target = Dataset;

    fn deref(&self) -> &Dataset {
        &self.dataset
    }
}

impl fmt::Debug for PublishedDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublishedDataset").field(&self.dataset).finish()
    }
}

impl Drop for PublishedDataset {
    fn drop(&mut self) {
        let dataset = mem::take(&mut self.dataset);
        self.operations.dataset_operations().destroy(dataset);
    }
}
