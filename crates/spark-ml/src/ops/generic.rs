//! 通用默认实现。

use tracing::warn;

use super::ExtensionPoint;
use crate::error::{ModelError, Result};
use crate::model::{Mode, Model};
use crate::types::{
    BackpropagationFeedback, Dataset, DatasetKind, DatasetState, ModelOptions, Notification,
    Portion, Recommendation, RequestConfig, RunConfig, SubsystemKind, SubsystemState, UserRequest,
};

/// 未覆写扩展点的回落实现。
///
/// # 教案式说明
/// - **意图 (Why)**：让只实现了部分扩展点的模型也能完整走完生命周期；
/// - **契约 (What)**：
///   - `create`：父子系统标记为 `Generic`，模式切到 `Emergency`；
///   - `init`/`re_init`：写入库默认休眠间隔；
///   - `destroy`：父子系统复位为 `Unknown`，模式复位为 `Unknown`；
///   - `get_dataset`：数据集标记为 `Empty/Clean`，尺寸与窗口清零；
///   - 其余扩展点一律拒绝，返回 `Unsupported`；
/// - **用法 (How)**：子系统钩子可以在自身逻辑前后直接调用这些函数，以复用默认行为。
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericOperations;

impl GenericOperations {
    pub fn create(model: &Model) -> Result<()> {
        model.parent().set_kind(SubsystemKind::Generic);
        model.set_mode(Mode::Emergency);
        Ok(())
    }

    pub fn init(_model: &Model, options: &mut ModelOptions) -> Result<()> {
        *options = options.with_sleep_timeout(ModelOptions::DEFAULT_SLEEP_TIMEOUT);
        Ok(())
    }

    pub fn re_init(_model: &Model, options: &mut ModelOptions) -> Result<()> {
        *options = options.with_sleep_timeout(ModelOptions::DEFAULT_SLEEP_TIMEOUT);
        Ok(())
    }

    pub fn start(model: &Model, _config: &RunConfig) -> Result<()> {
        decline(model, ExtensionPoint::Start)
    }

    pub fn stop(model: &Model) -> Result<()> {
        decline(model, ExtensionPoint::Stop)
    }

    pub fn destroy(model: &Model) {
        model.parent().set_kind(SubsystemKind::Unknown);
        model.set_mode(Mode::Unknown);
    }

    pub fn get_system_state(model: &Model) -> Result<SubsystemState> {
        decline(model, ExtensionPoint::GetSystemState)
    }

    pub fn get_dataset(
        _model: &Model,
        _config: &RequestConfig,
        _request: &UserRequest,
        dataset: &mut Dataset,
    ) -> Result<()> {
        dataset.set_kind(DatasetKind::Empty);
        dataset.set_state(DatasetState::Clean);
        dataset.set_allocated_size(0);
        dataset.set_portion(Portion::EMPTY);
        Ok(())
    }

    pub fn preprocess_data(model: &Model, _dataset: &Dataset) -> Result<()> {
        decline(model, ExtensionPoint::PreprocessData)
    }

    pub fn publish_data(model: &Model, _dataset: &Dataset, _notify: &Notification) -> Result<()> {
        decline(model, ExtensionPoint::PublishData)
    }

    pub fn preprocess_recommendation(model: &Model, _hint: &Recommendation) -> Result<()> {
        decline(model, ExtensionPoint::PreprocessRecommendation)
    }

    pub fn estimate_system_state(model: &Model) -> Result<()> {
        decline(model, ExtensionPoint::EstimateSystemState)
    }

    pub fn apply_recommendation(model: &Model, _hint: &Recommendation) -> Result<()> {
        decline(model, ExtensionPoint::ApplyRecommendation)
    }

    pub fn execute_operation(
        model: &Model,
        _hint: &Recommendation,
        _request: &UserRequest,
    ) -> Result<()> {
        decline(model, ExtensionPoint::ExecuteOperation)
    }

    pub fn estimate_efficiency(
        model: &Model,
        _hint: &Recommendation,
        _request: &UserRequest,
    ) -> Result<()> {
        decline(model, ExtensionPoint::EstimateEfficiency)
    }

    pub fn error_backpropagation(
        model: &Model,
        _feedback: &BackpropagationFeedback,
        _notify: &Notification,
    ) -> Result<()> {
        decline(model, ExtensionPoint::ErrorBackpropagation)
    }

    pub fn correct_system_state(model: &Model) -> Result<()> {
        decline(model, ExtensionPoint::CorrectSystemState)
    }
}

fn decline<T>(model: &Model, point: ExtensionPoint) -> Result<T> {
    warn!(
        model = model.model_name(),
        subsystem = model.subsystem_name(),
        operation = point.as_str(),
        "no override and no generic default; operation declined"
    );
    Err(ModelError::unsupported_point(point))
}
