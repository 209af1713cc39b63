//! 模型挂载配置。
//!
//! # 设计目标（Why）
//! - 宿主通常以 TOML 片段描述“挂载到哪个父节点、叫什么名字、初始轮询间隔多少”，
//!   本模块把这些字段收敛为强类型结构，并在解析阶段完成默认值回填；
//! - 缺省值与原始库保持一致：子系统名 `unknown_subsystem`、模型名 `unknown_model`、
//!   父节点为根节点、轮询间隔为库默认值。
//!
//! # 契约说明（What）
//! - 未知字段直接拒绝，避免拼写错误被静默忽略；
//! - 解析失败统一映射为 [`ModelError::InvalidArgument`]。

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ModelError, Result};
use crate::registry::ParentHandle;
use crate::types::ModelOptions;

/// 未提供子系统名时使用的名称。
pub const UNKNOWN_SUBSYSTEM_NAME: &str = "unknown_subsystem";
/// 未提供模型名时使用的名称。
pub const UNKNOWN_MODEL_NAME: &str = "unknown_model";

/// 模型挂载配置全集。
///
/// ```toml
/// subsystem_name = "ml_lib_test"
/// model_name = "ml_model1"
/// parent = "mllibdev"
///
/// [options]
/// sleep_timeout_ms = 250
///
/// [slots]
/// grace_spins = 2048
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub subsystem_name: String,
    pub model_name: String,
    pub parent: String,
    pub options: OptionsConfig,
    pub slots: SlotConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            subsystem_name: UNKNOWN_SUBSYSTEM_NAME.to_owned(),
            model_name: UNKNOWN_MODEL_NAME.to_owned(),
            parent: ParentHandle::ROOT_NAME.to_owned(),
            options: OptionsConfig::default(),
            slots: SlotConfig::default(),
        }
    }
}

impl ModelConfig {
    /// 从 TOML 文本解析配置。
    ///
    /// - **契约 (What)**：空文本得到全默认配置；名称字段不得为空串；
    /// - **错误**：语法错误、类型不匹配、未知字段与空名称均返回 `InvalidArgument`。
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ModelConfig = toml::from_str(text).map_err(|err| {
            ModelError::invalid_argument(format!("malformed model config: {}", err.message()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验名称字段。
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("subsystem_name", &self.subsystem_name),
            ("model_name", &self.model_name),
            ("parent", &self.parent),
        ] {
            if value.trim().is_empty() {
                return Err(ModelError::invalid_argument(format!(
                    "`{field}` must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// 父节点句柄。
    pub fn parent_handle(&self) -> ParentHandle {
        ParentHandle::new(self.parent.as_str())
    }

    /// `init` 时发布的初始选项。
    pub fn initial_options(&self) -> ModelOptions {
        self.options.to_options()
    }
}

/// 选项段。
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    /// 主循环休眠间隔（毫秒）。
    pub sleep_timeout_ms: u64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            sleep_timeout_ms: ModelOptions::DEFAULT_SLEEP_TIMEOUT.as_millis() as u64,
        }
    }
}

impl OptionsConfig {
    /// 转换为可发布的选项值。
    pub fn to_options(self) -> ModelOptions {
        ModelOptions::new(Duration::from_millis(self.sleep_timeout_ms))
    }
}

/// 发布槽段。
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SlotConfig {
    /// 回收旧值时静默屏障的最大让出次数。
    pub grace_spins: u32,
}

impl SlotConfig {
    /// 默认让出预算，足以覆盖读者守卫的典型持有时长。
    pub const DEFAULT_GRACE_SPINS: u32 = 1024;
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            grace_spins: Self::DEFAULT_GRACE_SPINS,
        }
    }
}
