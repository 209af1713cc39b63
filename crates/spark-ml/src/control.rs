//! 只写控制通道。
//!
//! 宿主把属性树中的控制文件写入转发到 [`ControlChannel::write`]：
//! 只接受 `start` 与 `stop` 两个记号（允许 `echo` 追加的单个换行），其余输入返回 `Unsupported`。

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ModelError, Result};
use crate::model::Model;
use crate::types::RunConfig;

/// 控制命令。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ControlCommand {
    Start,
    Stop,
}

impl ControlCommand {
    pub const fn as_str(self) -> &'static str {
        match self {
            ControlCommand::Start => "start",
            ControlCommand::Stop => "stop",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlCommand {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self> {
        let token = raw.strip_suffix('\n').unwrap_or(raw);
        match token {
            "start" => Ok(ControlCommand::Start),
            "stop" => Ok(ControlCommand::Stop),
            _ => Err(ModelError::unsupported(format!("control command {token:?}"))),
        }
    }
}

/// 绑定到单个模型的控制通道。
#[derive(Clone, Debug)]
pub struct ControlChannel {
    model: Arc<Model>,
}

impl ControlChannel {
    pub fn new(model: Arc<Model>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// 解析并执行一次写入。
    ///
    /// - **返回值**：成功时返回消耗的字节数（即 `input.len()`）；
    /// - **错误**：非法记号（含非 UTF-8 输入）返回 `Unsupported`；start/stop 的错误原样返回。
    pub fn write(&self, input: &[u8]) -> Result<usize> {
        let command = core::str::from_utf8(input)
            .map_err(|_| ModelError::unsupported("non-utf8 control command"))?
            .parse::<ControlCommand>()?;
        self.execute(command)?;
        Ok(input.len())
    }

    /// 执行已解析的命令；start 使用零值运行配置。
    pub fn execute(&self, command: ControlCommand) -> Result<()> {
        debug!(model = self.model.model_name(), command = command.as_str(), "control command");
        match command {
            ControlCommand::Start => self.model.start(&RunConfig::default()),
            ControlCommand::Stop => self.model.stop(),
        }
    }
}
