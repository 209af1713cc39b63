//! 数据集管线：获取（带缓存命中）与作废。
//!
//! # 契约说明（What）
//! - 读者只会看到完整且合法的数据集：分配、初始化、抽取、校验全部在发布之前完成；
//! - 任一步骤失败时，新对象经数据集拆卸钩子释放，错误原样返回，已发布的数据集（或其缺席）保持不变；
//! - 被替换的数据集在最后一个持有者释放时交给拆卸钩子，见 [`PublishedDataset`]。

use std::sync::Arc;

use tracing::{debug, error};

use super::{LifecycleState, Model};
use crate::error::{ModelError, Result};
use crate::ops::{ExtensionPoint, PublishedDataset};
use crate::types::{Dataset, DatasetState, RequestConfig, UserRequest};

impl Model {
    /// 获取当前可用的数据集。
    ///
    /// # 教案式说明
    /// - **缓存命中**：已发布数据集处于 `Clean`/`ExtractedPartially`/`ExtractedCompletely` 时，
    ///   直接返回同一对象，不做任何抽取；
    /// - **缓存未命中**：分配 → 数据集 init 钩子 → 抽取（get_dataset 钩子，缺省为 `Empty/Clean` 零值）
    ///   → 校验 → 发布；旧值在最后一个持有者释放时拆卸；
    /// - **阶段推进**：成功后处于存活阶段的模型推进到 `Running`；
    /// - **错误**：抽取钩子的错误原样返回；校验失败返回 `ExtractionFailure` 或 `Corrupted`，不自动重试。
    pub fn get_dataset(
        &self,
        config: &RequestConfig,
        request: &UserRequest,
    ) -> Result<Arc<PublishedDataset>> {
        let _fence = self.enter(ExtensionPoint::GetDataset.as_str())?;

        if let Some(current) = self.dataset.snapshot().filter(|ds| ds.state().is_reusable()) {
            self.advance_to_running();
            return Ok(current);
        }

        let dataset_ops = self.operations.dataset_operations();
        let mut fresh = dataset_ops.allocate()?;
        let prepared = dataset_ops
            .init(&mut fresh)
            .and_then(|()| self.operations.extract(self, config, request, &mut fresh))
            .and_then(|()| validate_extracted(&fresh));
        if let Err(err) = prepared {
            self.log_hook_failure(ExtensionPoint::GetDataset, &err);
            dataset_ops.destroy(fresh);
            return Err(err);
        }

        let published = Arc::new(PublishedDataset::new(fresh, self.operations.clone()));
        drop(self.dataset.publish_shared(Arc::clone(&published)));
        debug!(
            model = %self.model_name,
            state = %published.state(),
            offset = published.portion().offset,
            size = published.portion().size,
            "dataset published"
        );
        self.advance_to_running();
        Ok(published)
    }

    /// 以 `Obsolete` 替身替换当前数据集。
    ///
    /// - 已有数据集时复制其类型、尺寸与窗口；否则类型为 `Empty`，其余字段为零；
    /// - 替身先分配再发布，分配失败时什么也不提交。
    pub fn discard_dataset(&self) -> Result<()> {
        let _fence = self.enter("discard_dataset")?;
        let mut replacement = self.operations.dataset_operations().allocate()?;
        let operations = self.operations.clone();

        let superseded = self.dataset.publish_with(move |current| {
            replacement.mark_obsolete(current.map(PublishedDataset::dataset));
            PublishedDataset::new(replacement, operations)
        });
        drop(superseded);
        debug!(model = %self.model_name, "dataset discarded");
        Ok(())
    }

    fn advance_to_running(&self) {
        if let Some(from) = self.state.advance_live_to(LifecycleState::Running) {
            debug!(model = %self.model_name, from = %from, "model running");
        }
    }
}

/// 抽取结果在发布前的校验。
fn validate_extracted(dataset: &Dataset) -> Result<()> {
    match dataset.state() {
        DatasetState::ExtractionFailure => Err(ModelError::extraction_failure(
            "extraction step tagged the dataset as failed",
        )),
        state if state.is_failure() => Err(ModelError::corrupted(format!(
            "extraction step tagged the dataset as `{state}`"
        ))),
        state if state.is_reusable() => match dataset.portion().end() {
            Some(_) => Ok(()),
            None => {
                let portion = dataset.portion();
                error!(offset = portion.offset, size = portion.size, "dataset portion overflows");
                Err(ModelError::corrupted(format!(
                    "portion {}+{} overflows the stream offset space",
                    portion.offset, portion.size
                )))
            }
        },
        state => Err(ModelError::corrupted(format!(
            "extraction left the dataset in `{state}` state"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Portion;

    #[test]
    fn unpublishable_states_are_rejected() {
        let mut dataset = Dataset::default();
        dataset.set_state(DatasetState::Allocated);
        assert_eq!(
            validate_extracted(&dataset).map_err(|err| err.code()),
            Err("ml.dataset.corrupted")
        );

        dataset.set_state(DatasetState::ExtractionFailure);
        assert_eq!(
            validate_extracted(&dataset).map_err(|err| err.code()),
            Err("ml.dataset.extraction_failure")
        );

        dataset.set_state(DatasetState::Corrupted);
        assert_eq!(
            validate_extracted(&dataset).map_err(|err| err.code()),
            Err("ml.dataset.corrupted")
        );

        dataset.set_state(DatasetState::ExtractedPartially);
        dataset.set_portion(Portion::new(u64::MAX - 1, 8));
        assert_eq!(
            validate_extracted(&dataset).map_err(|err| err.code()),
            Err("ml.dataset.corrupted")
        );

        dataset.set_portion(Portion::new(64, 8));
        assert!(validate_extracted(&dataset).is_ok());
    }
}
