//! 生命周期操作：create → init/re_init → start/stop → destroy。

use tracing::{debug, error};

use super::{LifecycleState, Model};
use crate::error::{ModelError, Result};
use crate::ops::ExtensionPoint;
use crate::types::{ModelOptions, RunConfig};

impl Model {
    /// 向父节点登记并运行 create 钩子。
    ///
    /// # 教案式说明
    /// - **前置条件**：阶段为 `Unknown`；重复 create 返回 `InvalidArgument`，拆卸之后返回 `Unsupported`；
    /// - **执行 (How)**：登记 → 钩子（或通用默认）→ 保存凭据并进入 `Created`；
    /// - **失败语义**：登记失败直接返回；钩子失败时先撤销已完成的登记，阶段保持 `Unknown`，
    ///   调用方随后可直接释放模型；
    /// - **注意事项**：并发 create 在登记互斥区上串行，create 钩子内不得调用 [`registration`](Self::registration)。
    pub fn create(&self) -> Result<()> {
        let Some(_fence) = self.fence.try_enter() else {
            debug!(model = %self.model_name, "destroy in progress; create rejected");
            return Err(ModelError::unsupported_point(ExtensionPoint::Create));
        };
        let mut registration = self.registration.lock();
        match self.state() {
            LifecycleState::Unknown => {}
            state if state.is_tearing_down() => {
                return Err(ModelError::unsupported_point(ExtensionPoint::Create));
            }
            state => {
                return Err(ModelError::invalid_argument(format!(
                    "model `{}` is already {state}",
                    self.model_name
                )));
            }
        }

        let handle = self
            .registry
            .register(&self.model_name, &self.parent_handle)
            .inspect_err(|err| {
                error!(
                    model = %self.model_name,
                    parent = %self.parent_handle,
                    code = err.code(),
                    "failed to register model"
                );
            })?;

        if let Err(err) = self.operations.create(self) {
            error!(
                model = %self.model_name,
                subsystem = %self.subsystem_name,
                code = err.code(),
                error = %err,
                "create hook failed; rolling back registration"
            );
            self.registry.deregister(handle);
            return Err(err);
        }

        *registration = Some(handle);
        self.state.store(LifecycleState::Created);
        debug!(model = %self.model_name, subsystem = %self.subsystem_name, "model created");
        Ok(())
    }

    /// 构造并发布首份选项；`Created` 阶段的模型进入 `Initialized`。
    ///
    /// - **输入参数**：`options` 为宿主提供的初值（通常来自 [`ModelConfig`](crate::ModelConfig)
    ///   或新分配对象的哨兵值），init 钩子在发布前修改它；通用默认实现写入库默认休眠间隔；
    /// - **后置条件**：成功时旧选项被替换并在静默屏障后回收；失败时选项槽与阶段均不变。
    pub fn init(&self, options: ModelOptions) -> Result<()> {
        let _fence = self.enter(ExtensionPoint::Init.as_str())?;
        let mut options = options;
        self.operations
            .init(self, &mut options)
            .inspect_err(|err| self.log_hook_failure(ExtensionPoint::Init, err))?;
        self.replace_options(options);
        if self
            .state
            .compare_exchange(LifecycleState::Created, LifecycleState::Initialized)
            .is_ok()
        {
            debug!(model = %self.model_name, "model initialized");
        }
        Ok(())
    }

    /// 以新选项替换当前选项，不改变生命周期阶段。
    pub fn re_init(&self, options: ModelOptions) -> Result<()> {
        let _fence = self.enter(ExtensionPoint::ReInit.as_str())?;
        let mut options = options;
        self.operations
            .re_init(self, &mut options)
            .inspect_err(|err| self.log_hook_failure(ExtensionPoint::ReInit, err))?;
        self.replace_options(options);
        debug!(model = %self.model_name, sleep_timeout = ?options.sleep_timeout(), "options replaced");
        Ok(())
    }

    /// 运行 start 钩子，成功后进入 `Started`。
    pub fn start(&self, config: &RunConfig) -> Result<()> {
        let _fence = self.enter(ExtensionPoint::Start.as_str())?;
        self.operations
            .start(self, config)
            .inspect_err(|err| self.log_hook_failure(ExtensionPoint::Start, err))?;
        self.state.store(LifecycleState::Started);
        debug!(model = %self.model_name, "model started");
        Ok(())
    }

    /// 运行 stop 钩子，成功后进入 `Stopped`。
    pub fn stop(&self) -> Result<()> {
        let _fence = self.enter(ExtensionPoint::Stop.as_str())?;
        self.operations
            .stop(self)
            .inspect_err(|err| self.log_hook_failure(ExtensionPoint::Stop, err))?;
        self.state.store(LifecycleState::Stopped);
        debug!(model = %self.model_name, "model stopped");
        Ok(())
    }

    /// 拆卸模型。
    ///
    /// # 教案式说明
    /// - **意图 (Why)**：作为唯一的屏障操作，等待在途操作完成，且之后不会有操作越过它；
    /// - **执行 (How)**：
    ///   1. 独占生命周期栅栏，阶段切到 `ShuttingDown`；
    ///   2. 清空选项槽、数据集槽与子系统快照槽；数据集拆卸钩子在其最后一个持有者释放时运行；
    ///   3. 运行 destroy 钩子（或通用默认），注销登记，阶段切到 `Terminal`；
    /// - **契约 (What)**：幂等；`Terminal` 阶段的再次调用不运行任何钩子；从未 create 的模型直接进入 `Terminal`。
    ///   拆卸期间（包括 destroy 钩子内部）对同一模型的其它调用立即返回 `Unsupported`。
    pub fn destroy(&self) {
        let _fence = self.fence.exclusive();
        match self.state() {
            LifecycleState::Terminal => {
                debug!(model = %self.model_name, "destroy on terminal model is a no-op");
                return;
            }
            LifecycleState::Unknown => {
                self.state.store(LifecycleState::Terminal);
                debug!(model = %self.model_name, "destroyed model that was never created");
                return;
            }
            _ => {}
        }
        self.state.store(LifecycleState::ShuttingDown);

        if let Some(old) = self.options.clear() {
            let _ = self.options.reclaim(old);
        }
        // 数据集拆卸钩子在最后一个持有者释放时运行，可能晚于本次 destroy。
        drop(self.dataset.clear());
        if let Some(old) = self.parent_state.clear() {
            let _ = self.parent_state.reclaim(old);
        }

        self.operations.destroy(self);

        if let Some(handle) = self.registration.lock().take() {
            self.registry.deregister(handle);
        }
        self.state.store(LifecycleState::Terminal);
        debug!(model = %self.model_name, subsystem = %self.subsystem_name, "model destroyed");
    }

    fn replace_options(&self, options: ModelOptions) {
        if let Some(old) = self.options.publish(options) {
            let _ = self.options.reclaim(old);
        }
    }

    pub(super) fn log_hook_failure(&self, point: ExtensionPoint, err: &ModelError) {
        if err.is_unsupported() {
            debug!(model = %self.model_name, operation = point.as_str(), "operation unsupported");
        } else {
            error!(
                model = %self.model_name,
                subsystem = %self.subsystem_name,
                operation = point.as_str(),
                code = err.code(),
                error = %err,
                "extension hook failed"
            );
        }
    }
}
