//! 其余扩展点：子系统快照、数据预处理与发布、建议与反馈。
//!
//! 这些操作只做分发：进入生命周期栅栏、校验阶段、调用覆写或通用默认实现。
//! 除 `refresh_system_state` 会发布子系统快照外，均不修改模型状态。

use super::Model;
use crate::error::Result;
use crate::ops::ExtensionPoint;
use crate::types::{BackpropagationFeedback, Dataset, Notification, Recommendation, UserRequest};

impl Model {
    /// 通过 get_system_state 钩子生成子系统快照并发布。
    pub fn refresh_system_state(&self) -> Result<()> {
        let _fence = self.enter(ExtensionPoint::GetSystemState.as_str())?;
        let snapshot = self
            .operations
            .get_system_state(self)
            .inspect_err(|err| self.log_hook_failure(ExtensionPoint::GetSystemState, err))?;
        if let Some(old) = self.parent_state.publish(snapshot) {
            let _ = self.parent_state.reclaim(old);
        }
        Ok(())
    }

    pub fn preprocess_data(&self, dataset: &Dataset) -> Result<()> {
        let point = ExtensionPoint::PreprocessData;
        let _fence = self.enter(point.as_str())?;
        self.operations
            .preprocess_data(self, dataset)
            .inspect_err(|err| self.log_hook_failure(point, err))
    }

    /// 把数据集连同通知推送给用户态。
    pub fn publish_data(&self, dataset: &Dataset, notification: &Notification) -> Result<()> {
        let point = ExtensionPoint::PublishData;
        let _fence = self.enter(point.as_str())?;
        self.operations
            .publish_data(self, dataset, notification)
            .inspect_err(|err| self.log_hook_failure(point, err))
    }

    pub fn preprocess_recommendation(&self, hint: &Recommendation) -> Result<()> {
        let point = ExtensionPoint::PreprocessRecommendation;
        let _fence = self.enter(point.as_str())?;
        self.operations
            .preprocess_recommendation(self, hint)
            .inspect_err(|err| self.log_hook_failure(point, err))
    }

    pub fn estimate_system_state(&self) -> Result<()> {
        let point = ExtensionPoint::EstimateSystemState;
        let _fence = self.enter(point.as_str())?;
        self.operations
            .estimate_system_state(self)
            .inspect_err(|err| self.log_hook_failure(point, err))
    }

    pub fn apply_recommendation(&self, hint: &Recommendation) -> Result<()> {
        let point = ExtensionPoint::ApplyRecommendation;
        let _fence = self.enter(point.as_str())?;
        self.operations
            .apply_recommendation(self, hint)
            .inspect_err(|err| self.log_hook_failure(point, err))
    }

    pub fn execute_operation(&self, hint: &Recommendation, request: &UserRequest) -> Result<()> {
        let point = ExtensionPoint::ExecuteOperation;
        let _fence = self.enter(point.as_str())?;
        self.operations
            .execute_operation(self, hint, request)
            .inspect_err(|err| self.log_hook_failure(point, err))
    }

    pub fn estimate_efficiency(&self, hint: &Recommendation, request: &UserRequest) -> Result<()> {
        let point = ExtensionPoint::EstimateEfficiency;
        let _fence = self.enter(point.as_str())?;
        self.operations
            .estimate_efficiency(self, hint, request)
            .inspect_err(|err| self.log_hook_failure(point, err))
    }

    /// 把误差反馈交给模型做反向传播。
    pub fn error_backpropagation(
        &self,
        feedback: &BackpropagationFeedback,
        notification: &Notification,
    ) -> Result<()> {
        let point = ExtensionPoint::ErrorBackpropagation;
        let _fence = self.enter(point.as_str())?;
        self.operations
            .error_backpropagation(self, feedback, notification)
            .inspect_err(|err| self.log_hook_failure(point, err))
    }

    pub fn correct_system_state(&self) -> Result<()> {
        let point = ExtensionPoint::CorrectSystemState;
        let _fence = self.enter(point.as_str())?;
        self.operations
            .correct_system_state(self)
            .inspect_err(|err| self.log_hook_failure(point, err))
    }
}
