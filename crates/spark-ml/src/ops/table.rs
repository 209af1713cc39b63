//! 覆写表与两级分发。

use core::fmt;
use core::ops::Deref;
use std::sync::Arc;

use super::dataset::DatasetOperations;
use super::generic::GenericOperations;
use super::ExtensionPoint;
use crate::error::Result;
use crate::model::Model;
use crate::types::{
    BackpropagationFeedback, Dataset, ModelOptions, Notification, Recommendation, RequestConfig,
    RunConfig, SubsystemState, UserRequest,
};

/// 仅接收模型的钩子：create、stop、estimate_system_state、correct_system_state。
pub type ModelHook = Arc<dyn Fn(&Model) -> Result<()> + Send + Sync>;
/// init/re_init 钩子：在发布前填写新选项。
pub type OptionsHook = Arc<dyn Fn(&Model, &mut ModelOptions) -> Result<()> + Send + Sync>;
/// start 钩子。
pub type StartHook = Arc<dyn Fn(&Model, &RunConfig) -> Result<()> + Send + Sync>;
/// destroy 钩子，不可失败。
pub type DestroyHook = Arc<dyn Fn(&Model) + Send + Sync>;
/// get_system_state 钩子。
pub type SystemStateHook = Arc<dyn Fn(&Model) -> Result<SubsystemState> + Send + Sync>;
/// get_dataset 钩子：抽取步骤，填写尚未发布的数据集。
pub type ExtractHook = Arc<
    dyn Fn(&Model, &RequestConfig, &UserRequest, &mut Dataset) -> Result<()> + Send + Sync,
>;
/// preprocess_data 钩子。
pub type DatasetHook = Arc<dyn Fn(&Model, &Dataset) -> Result<()> + Send + Sync>;
/// publish_data 钩子。
pub type PublishHook = Arc<dyn Fn(&Model, &Dataset, &Notification) -> Result<()> + Send + Sync>;
/// preprocess_recommendation / apply_recommendation 钩子。
pub type RecommendationHook = Arc<dyn Fn(&Model, &Recommendation) -> Result<()> + Send + Sync>;
/// execute_operation / estimate_efficiency 钩子。
pub type OperationHook =
    Arc<dyn Fn(&Model, &Recommendation, &UserRequest) -> Result<()> + Send + Sync>;
/// error_backpropagation 钩子。
pub type BackpropagationHook =
    Arc<dyn Fn(&Model, &BackpropagationFeedback, &Notification) -> Result<()> + Send + Sync>;

static GENERIC_TABLE: OperationTable = OperationTable::empty();

/// 子系统覆写表。
///
/// # 教案式说明
/// - **意图 (Why)**：以“可选闭包”表达函数指针表中的空槽，空槽即回落到 [`GenericOperations`]；
/// - **逻辑 (How)**：每个字段对应一个扩展点；分发时先查覆写，再调用通用默认实现；
/// - **契约 (What)**：表在挂载后不可变，多个模型可共享同一张表；
/// - **风险 (Trade-offs)**：钩子以 `Arc<dyn Fn>` 保存，调用多一次间接跳转，换取运行期可组合。
#[derive(Clone, Default)]
pub struct OperationTable {
    create: Option<ModelHook>,
    init: Option<OptionsHook>,
    re_init: Option<OptionsHook>,
    start: Option<StartHook>,
    stop: Option<ModelHook>,
    destroy: Option<DestroyHook>,
    get_system_state: Option<SystemStateHook>,
    get_dataset: Option<ExtractHook>,
    preprocess_data: Option<DatasetHook>,
    publish_data: Option<PublishHook>,
    preprocess_recommendation: Option<RecommendationHook>,
    estimate_system_state: Option<ModelHook>,
    apply_recommendation: Option<RecommendationHook>,
    execute_operation: Option<OperationHook>,
    estimate_efficiency: Option<OperationHook>,
    error_backpropagation: Option<BackpropagationHook>,
    correct_system_state: Option<ModelHook>,
    dataset: DatasetOperations,
}

impl OperationTable {
    /// 不含任何覆写的表，全部扩展点回落到通用默认实现。
    pub const fn empty() -> Self {
        Self {
            create: None,
            init: None,
            re_init: None,
            start: None,
            stop: None,
            destroy: None,
            get_system_state: None,
            get_dataset: None,
            preprocess_data: None,
            publish_data: None,
            preprocess_recommendation: None,
            estimate_system_state: None,
            apply_recommendation: None,
            execute_operation: None,
            estimate_efficiency: None,
            error_backpropagation: None,
            correct_system_state: None,
            dataset: DatasetOperations::empty(),
        }
    }

    /// 进程级共享的通用分发表。
    pub fn generic() -> &'static OperationTable {
        &GENERIC_TABLE
    }

    pub fn builder() -> OperationTableBuilder {
        OperationTableBuilder::default()
    }

    /// 数据集对象钩子。
    pub fn dataset_operations(&self) -> &DatasetOperations {
        &self.dataset
    }

    /// 扩展点是否被覆写。
    pub fn has_override(&self, point: ExtensionPoint) -> bool {
        match point {
            ExtensionPoint::Create => self.create.is_some(),
            ExtensionPoint::Init => self.init.is_some(),
            ExtensionPoint::ReInit => self.re_init.is_some(),
            ExtensionPoint::Start => self.start.is_some(),
            ExtensionPoint::Stop => self.stop.is_some(),
            ExtensionPoint::Destroy => self.destroy.is_some(),
            ExtensionPoint::GetSystemState => self.get_system_state.is_some(),
            ExtensionPoint::GetDataset => self.get_dataset.is_some(),
            ExtensionPoint::PreprocessData => self.preprocess_data.is_some(),
            ExtensionPoint::PublishData => self.publish_data.is_some(),
            ExtensionPoint::PreprocessRecommendation => self.preprocess_recommendation.is_some(),
            ExtensionPoint::EstimateSystemState => self.estimate_system_state.is_some(),
            ExtensionPoint::ApplyRecommendation => self.apply_recommendation.is_some(),
            ExtensionPoint::ExecuteOperation => self.execute_operation.is_some(),
            ExtensionPoint::EstimateEfficiency => self.estimate_efficiency.is_some(),
            ExtensionPoint::ErrorBackpropagation => self.error_backpropagation.is_some(),
            ExtensionPoint::CorrectSystemState => self.correct_system_state.is_some(),
        }
    }

    /// 返回移除了单个覆写的新表，其余覆写保持共享。
    pub fn without(&self, point: ExtensionPoint) -> OperationTable {
        let mut table = self.clone();
        match point {
            ExtensionPoint::Create => table.create = None,
            ExtensionPoint::Init => table.init = None,
            ExtensionPoint::ReInit => table.re_init = None,
            ExtensionPoint::Start => table.start = None,
            ExtensionPoint::Stop => table.stop = None,
            ExtensionPoint::Destroy => table.destroy = None,
            ExtensionPoint::GetSystemState => table.get_system_state = None,
            ExtensionPoint::GetDataset => table.get_dataset = None,
            ExtensionPoint::PreprocessData => table.preprocess_data = None,
            ExtensionPoint::PublishData => table.publish_data = None,
            ExtensionPoint::PreprocessRecommendation => table.preprocess_recommendation = None,
            ExtensionPoint::EstimateSystemState => table.estimate_system_state = None,
            ExtensionPoint::ApplyRecommendation => table.apply_recommendation = None,
            ExtensionPoint::ExecuteOperation => table.execute_operation = None,
            ExtensionPoint::EstimateEfficiency => table.estimate_efficiency = None,
            ExtensionPoint::ErrorBackpropagation => table.error_backpropagation = None,
            ExtensionPoint::CorrectSystemState => table.correct_system_state = None,
        }
        table
    }

    pub(crate) fn create(&self, model: &Model) -> Result<()> {
        match &self.create {
            Some(hook) => hook(model),
            None => GenericOperations::create(model),
        }
    }

    pub(crate) fn init(&self, model: &Model, options: &mut ModelOptions) -> Result<()> {
        match &self.init {
            Some(hook) => hook(model, options),
            None => GenericOperations::init(model, options),
        }
    }

    pub(crate) fn re_init(&self, model: &Model, options: &mut ModelOptions) -> Result<()> {
        match &self.re_init {
            Some(hook) => hook(model, options),
            None => GenericOperations::re_init(model, options),
        }
    }

    pub(crate) fn start(&self, model: &Model, config: &RunConfig) -> Result<()> {
        match &self.start {
            Some(hook) => hook(model, config),
            None => GenericOperations::start(model, config),
        }
    }

    pub(crate) fn stop(&self, model: &Model) -> Result<()> {
        match &self.stop {
            Some(hook) => hook(model),
            None => GenericOperations::stop(model),
        }
    }

    pub(crate) fn destroy(&self, model: &Model) {
        match &self.destroy {
            Some(hook) => hook(model),
            None => GenericOperations::destroy(model),
        }
    }

    pub(crate) fn get_system_state(&self, model: &Model) -> Result<SubsystemState> {
        match &self.get_system_state {
            Some(hook) => hook(model),
            None => GenericOperations::get_system_state(model),
        }
    }

    pub(crate) fn extract(
        &self,
        model: &Model,
        config: &RequestConfig,
        request: &UserRequest,
        dataset: &mut Dataset,
    ) -> Result<()> {
        match &self.get_dataset {
            Some(hook) => hook(model, config, request, dataset),
            None => GenericOperations::get_dataset(model, config, request, dataset),
        }
    }

    pub(crate) fn preprocess_data(&self, model: &Model, dataset: &Dataset) -> Result<()> {
        match &self.preprocess_data {
            Some(hook) => hook(model, dataset),
            None => GenericOperations::preprocess_data(model, dataset),
        }
    }

    pub(crate) fn publish_data(
        &self,
        model: &Model,
        dataset: &Dataset,
        notification: &Notification,
    ) -> Result<()> {
        match &self.publish_data {
            Some(hook) => hook(model, dataset, notification),
            None => GenericOperations::publish_data(model, dataset, notification),
        }
    }

    pub(crate) fn preprocess_recommendation(
        &self,
        model: &Model,
        hint: &Recommendation,
    ) -> Result<()> {
        match &self.preprocess_recommendation {
            Some(hook) => hook(model, hint),
            None => GenericOperations::preprocess_recommendation(model, hint),
        }
    }

    pub(crate) fn estimate_system_state(&self, model: &Model) -> Result<()> {
        match &self.estimate_system_state {
            Some(hook) => hook(model),
            None => GenericOperations::estimate_system_state(model),
        }
    }

    pub(crate) fn apply_recommendation(&self, model: &Model, hint: &Recommendation) -> Result<()> {
        match &self.apply_recommendation {
            Some(hook) => hook(model, hint),
            None => GenericOperations::apply_recommendation(model, hint),
        }
    }

    pub(crate) fn execute_operation(
        &self,
        model: &Model,
        hint: &Recommendation,
        request: &UserRequest,
    ) -> Result<()> {
        match &self.execute_operation {
            Some(hook) => hook(model, hint, request),
            None => GenericOperations::execute_operation(model, hint, request),
        }
    }

    pub(crate) fn estimate_efficiency(
        &self,
        model: &Model,
        hint: &Recommendation,
        request: &UserRequest,
    ) -> Result<()> {
        match &self.estimate_efficiency {
            Some(hook) => hook(model, hint, request),
            None => GenericOperations::estimate_efficiency(model, hint, request),
        }
    }

    pub(crate) fn error_backpropagation(
        &self,
        model: &Model,
        feedback: &BackpropagationFeedback,
        notification: &Notification,
    ) -> Result<()> {
        match &self.error_backpropagation {
            Some(hook) => hook(model, feedback, notification),
            None => GenericOperations::error_backpropagation(model, feedback, notification),
        }
    }

    pub(crate) fn correct_system_state(&self, model: &Model) -> Result<()> {
        match &self.correct_system_state {
            Some(hook) => hook(model),
            None => GenericOperations::correct_system_state(model),
        }
    }
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overridden: Vec<_> = ExtensionPoint::ALL
            .into_iter()
            .filter(|point| self.has_override(*point))
            .map(ExtensionPoint::as_str)
            .collect();
        f.debug_struct("OperationTable")
            .field("overridden", &overridden)
            .field("dataset", &self.dataset)
            .finish()
    }
}

/// 覆写表构建器。
///
/// ```
/// use spark_ml::{ModelError, OperationTable};
///
/// let table = OperationTable::builder()
///     .on_start(|_model, _config| Ok(()))
///     .on_stop(|_model| Err(ModelError::unsupported("stop")))
///     .build();
/// assert!(table.has_override(spark_ml::ExtensionPoint::Start));
/// ```
#[derive(Default)]
#[must_use]
pub struct OperationTableBuilder {
    table: OperationTable,
}

impl OperationTableBuilder {
    pub fn on_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model) -> Result<()> + Send + Sync + 'static,
    {
        self.table.create = Some(Arc::new(hook));
        self
    }

    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &mut ModelOptions) -> Result<()> + Send + Sync + 'static,
    {
        self.table.init = Some(Arc::new(hook));
        self
    }

    pub fn on_re_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &mut ModelOptions) -> Result<()> + Send + Sync + 'static,
    {
        self.table.re_init = Some(Arc::new(hook));
        self
    }

    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &RunConfig) -> Result<()> + Send + Sync + 'static,
    {
        self.table.start = Some(Arc::new(hook));
        self
    }

    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model) -> Result<()> + Send + Sync + 'static,
    {
        self.table.stop = Some(Arc::new(hook));
        self
    }

    pub fn on_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model) + Send + Sync + 'static,
    {
        self.table.destroy = Some(Arc::new(hook));
        self
    }

    pub fn on_get_system_state<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model) -> Result<SubsystemState> + Send + Sync + 'static,
    {
        self.table.get_system_state = Some(Arc::new(hook));
        self
    }

    /// 覆写 get_dataset 的抽取步骤。
    pub fn on_get_dataset<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &RequestConfig, &UserRequest, &mut Dataset) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.table.get_dataset = Some(Arc::new(hook));
        self
    }

    pub fn on_preprocess_data<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &Dataset) -> Result<()> + Send + Sync + 'static,
    {
        self.table.preprocess_data = Some(Arc::new(hook));
        self
    }

    pub fn on_publish_data<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &Dataset, &Notification) -> Result<()> + Send + Sync + 'static,
    {
        self.table.publish_data = Some(Arc::new(hook));
        self
    }

    pub fn on_preprocess_recommendation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &Recommendation) -> Result<()> + Send + Sync + 'static,
    {
        self.table.preprocess_recommendation = Some(Arc::new(hook));
        self
    }

    pub fn on_estimate_system_state<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model) -> Result<()> + Send + Sync + 'static,
    {
        self.table.estimate_system_state = Some(Arc::new(hook));
        self
    }

    pub fn on_apply_recommendation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &Recommendation) -> Result<()> + Send + Sync + 'static,
    {
        self.table.apply_recommendation = Some(Arc::new(hook));
        self
    }

    pub fn on_execute_operation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &Recommendation, &UserRequest) -> Result<()> + Send + Sync + 'static,
    {
        self.table.execute_operation = Some(Arc::new(hook));
        self
    }

    pub fn on_estimate_efficiency<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &Recommendation, &UserRequest) -> Result<()> + Send + Sync + 'static,
    {
        self.table.estimate_efficiency = Some(Arc::new(hook));
        self
    }

    pub fn on_error_backpropagation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &BackpropagationFeedback, &Notification) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.table.error_backpropagation = Some(Arc::new(hook));
        self
    }

    pub fn on_correct_system_state<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model) -> Result<()> + Send + Sync + 'static,
    {
        self.table.correct_system_state = Some(Arc::new(hook));
        self
    }

    pub fn on_dataset_allocate<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) -> Result<Dataset> + Send + Sync + 'static,
    {
        self.table.dataset.allocate = Some(Arc::new(hook));
        self
    }

    pub fn on_dataset_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Dataset) -> Result<()> + Send + Sync + 'static,
    {
        self.table.dataset.init = Some(Arc::new(hook));
        self
    }

    pub fn on_dataset_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(Dataset) + Send + Sync + 'static,
    {
        self.table.dataset.destroy = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> OperationTable {
        self.table
    }
}

/// 模型持有的分发表引用：通用表以 `'static` 引用共享，自带表以 `Arc` 共享。
#[derive(Clone)]
pub(crate) enum OperationsRef {
    Generic(&'static OperationTable),
    Attached(Arc<OperationTable>),
}

impl OperationsRef {
    pub(crate) fn generic() -> Self {
        OperationsRef::Generic(OperationTable::generic())
    }

    pub(crate) fn is_generic(&self) -> bool {
        matches!(self, OperationsRef::Generic(_))
    }
}

impl Deref for OperationsRef {
    type Target = OperationTable;

    fn deref(&self) -> &OperationTable {
        match self {
            OperationsRef::Generic(table) => table,
            OperationsRef::Attached(table) => table,
        }
    }
}

impl fmt::Debug for OperationsRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationsRef::Generic(_) => f.write_str("OperationsRef::Generic"),
            OperationsRef::Attached(table) => {
                f.debug_tuple("OperationsRef::Attached").field(table).finish()
            }
        }
    }
}
