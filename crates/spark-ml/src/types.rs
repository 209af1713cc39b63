//! 模型宿主的数据模型。
//!
//! # 设计目标（Why）
//! - 选项、数据集、子系统快照都是“整体替换、发布后不可变”的值类型，统一放在此处；
//! - 标签字段（数据集类型/状态、子系统类别等）以 `#[repr(u8)]` 枚举表达，
//!   需要原子读写的轴再通过 `atomic_tag_cell!` 包装。
//!
//! # 契约说明（What）
//! - 数据集的 *portion* 描述底层数据流中的一个窗口（偏移 + 长度），不是完整副本；
//! - 扩展点负载（请求、通知、建议、反馈）对核心不透明，仅做透传。

use core::fmt;
use std::mem;
use std::time::Duration;

use bytes::Bytes;

use crate::alloc::Footprint;
use crate::macros::{atomic_tag_cell, opaque_payload};

/// 模型可调选项，整体替换、不做原地修改。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelOptions {
    sleep_timeout: Duration,
}

impl ModelOptions {
    /// 通用 init/re_init 写入的默认休眠间隔。
    pub const DEFAULT_SLEEP_TIMEOUT: Duration = Duration::from_millis(1_000);
    /// 新分配选项携带的“永不唤醒”哨兵值。
    pub const NEVER_WAKE: Duration = Duration::from_millis(u32::MAX as u64);

    /// 以指定休眠间隔构造选项。
    pub const fn new(sleep_timeout: Duration) -> Self {
        Self { sleep_timeout }
    }

    /// 主循环休眠间隔。
    pub fn sleep_timeout(&self) -> Duration {
        self.sleep_timeout
    }

    /// 返回替换了休眠间隔的新选项。
    pub fn with_sleep_timeout(self, sleep_timeout: Duration) -> Self {
        Self { sleep_timeout }
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SLEEP_TIMEOUT)
    }
}

impl Footprint for ModelOptions {
    fn zeroed(_size: usize) -> Self {
        Self::new(Self::NEVER_WAKE)
    }
}

/// start/stop 携带的运行配置，用于修正模型选项。
///
/// 零值表示“沿用当前选项”，控制通道即以零值调用 `start`。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub sleep_timeout: Duration,
}

impl RunConfig {
    /// 以休眠间隔构造运行配置。
    pub const fn new(sleep_timeout: Duration) -> Self {
        Self { sleep_timeout }
    }

    /// 是否携带有效的修正值。
    pub fn overrides_sleep_timeout(&self) -> bool {
        !self.sleep_timeout.is_zero()
    }
}

/// 数据集类型标签。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DatasetKind {
    #[default]
    Unknown,
    /// 不含任何抽取内容的数据集。
    Empty,
    /// 子系统自定义的类型编号。
    Custom(u32),
}

/// 数据集状态标签。
///
/// 合法演进：`Unknown → Allocated → {Clean | ExtractedPartially | ExtractedCompletely} → Obsolete`；
/// `ExtractionFailure` 与 `Corrupted` 为任何抽取尝试都可能到达的错误终态。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum DatasetState {
    #[default]
    Unknown = 0,
    Allocated = 1,
    Clean = 2,
    ExtractedPartially = 3,
    ExtractedCompletely = 4,
    Obsolete = 5,
    ExtractionFailure = 6,
    Corrupted = 7,
}

impl DatasetState {
    /// 处于此状态的已发布数据集可直接复用，无需再次抽取。
    pub fn is_reusable(self) -> bool {
        matches!(
            self,
            DatasetState::Clean | DatasetState::ExtractedPartially | DatasetState::ExtractedCompletely
        )
    }

    /// 错误终态。
    pub fn is_failure(self) -> bool {
        matches!(self, DatasetState::ExtractionFailure | DatasetState::Corrupted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetState::Unknown => "unknown",
            DatasetState::Allocated => "allocated",
            DatasetState::Clean => "clean",
            DatasetState::ExtractedPartially => "extracted_partially",
            DatasetState::ExtractedCompletely => "extracted_completely",
            DatasetState::Obsolete => "obsolete",
            DatasetState::ExtractionFailure => "extraction_failure",
            DatasetState::Corrupted => "corrupted",
        }
    }
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 底层数据流中的窗口。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Portion {
    pub offset: u64,
    pub size: u32,
}

impl Portion {
    /// 零窗口。
    pub const EMPTY: Portion = Portion { offset: 0, size: 0 };

    pub const fn new(offset: u64, size: u32) -> Self {
        Self { offset, size }
    }

    /// 窗口结束位置；溢出流偏移空间时返回 `None`。
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(u64::from(self.size))
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// 子系统导出的数据集描述。
///
/// # 教案式说明
/// - **意图 (Why)**：描述一次抽取的结果窗口而非数据本身，使发布/回收保持轻量；
/// - **契约 (What)**：发布之后不再修改；抽取钩子只在发布前通过 `&mut Dataset` 填写字段；
/// - **风险 (Trade-offs)**：`allocated_size` 由分配路径之外的抽取钩子填写，核心不校验其与窗口的关系。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Dataset {
    kind: DatasetKind,
    state: DatasetState,
    allocated_size: usize,
    portion: Portion,
}

impl Dataset {
    /// 以全部字段构造数据集。
    pub fn new(
        kind: DatasetKind,
        state: DatasetState,
        allocated_size: usize,
        portion: Portion,
    ) -> Self {
        Self {
            kind,
            state,
            allocated_size,
            portion,
        }
    }

    /// 不含任何内容的干净数据集：`Empty/Clean`，尺寸与窗口均为零。
    pub fn empty_clean() -> Self {
        Self::new(DatasetKind::Empty, DatasetState::Clean, 0, Portion::EMPTY)
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn state(&self) -> DatasetState {
        self.state
    }

    pub fn allocated_size(&self) -> usize {
        self.allocated_size
    }

    pub fn portion(&self) -> Portion {
        self.portion
    }

    pub fn set_kind(&mut self, kind: DatasetKind) {
        self.kind = kind;
    }

    pub fn set_state(&mut self, state: DatasetState) {
        self.state = state;
    }

    pub fn set_allocated_size(&mut self, allocated_size: usize) {
        self.allocated_size = allocated_size;
    }

    pub fn set_portion(&mut self, portion: Portion) {
        self.portion = portion;
    }

    /// 把本对象填写为 `previous` 的作废替身。
    ///
    /// - `previous` 存在时复制其类型、尺寸与窗口；否则类型为 `Empty`，尺寸与窗口清零；
    /// - 无论哪种情况，状态都置为 `Obsolete`。
    pub fn mark_obsolete(&mut self, previous: Option<&Dataset>) {
        match previous {
            Some(previous) => {
                self.kind = previous.kind;
                self.allocated_size = previous.allocated_size;
                self.portion = previous.portion;
            }
            None => {
                self.kind = DatasetKind::Empty;
                self.allocated_size = 0;
                self.portion = Portion::EMPTY;
            }
        }
        self.state = DatasetState::Obsolete;
    }
}

impl Footprint for Dataset {
    fn zeroed(_size: usize) -> Self {
        Self {
            state: DatasetState::Allocated,
            ..Self::default()
        }
    }
}

/// 父子系统类别。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum SubsystemKind {
    #[default]
    Unknown = 0,
    /// 由通用 create 默认实现标记：子系统未提供专用挂载逻辑。
    Generic = 1,
    /// 由子系统自己的 create 钩子标记。
    Specialized = 2,
}

impl SubsystemKind {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SubsystemKind::Generic,
            2 => SubsystemKind::Specialized,
            _ => SubsystemKind::Unknown,
        }
    }
}

atomic_tag_cell! {
    /// 子系统类别的原子单元。
    pub struct AtomicSubsystemKind(SubsystemKind);
}

/// 父子系统对象。
#[derive(Debug)]
pub struct Subsystem {
    kind: AtomicSubsystemKind,
    size: usize,
}

impl Subsystem {
    /// 构造类别为 `Unknown` 的子系统对象。
    pub fn new() -> Self {
        Self::zeroed(mem::size_of::<Self>())
    }

    pub fn kind(&self) -> SubsystemKind {
        self.kind.load()
    }

    /// 更新类别标签；挂载钩子借此声明自身身份。
    pub fn set_kind(&self, kind: SubsystemKind) {
        self.kind.store(kind);
    }

    /// 分配时记录的字节数。
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for Subsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Footprint for Subsystem {
    fn zeroed(size: usize) -> Self {
        Self {
            kind: AtomicSubsystemKind::new(SubsystemKind::Unknown),
            size,
        }
    }
}

/// 子系统快照中的阶段标签。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum SubsystemPhase {
    #[default]
    Unknown,
    Created,
    Initialized,
    Started,
    Running,
    ShuttingDown,
    Stopped,
}

/// 子系统状态快照：由父子系统按需生成，对模型只读。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubsystemState {
    phase: SubsystemPhase,
    payload: Bytes,
}

impl SubsystemState {
    pub fn new(phase: SubsystemPhase, payload: impl Into<Bytes>) -> Self {
        Self {
            phase,
            payload: payload.into(),
        }
    }

    pub fn phase(&self) -> SubsystemPhase {
        self.phase
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// 请求配置的类型标签。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum RequestConfigKind {
    Unknown,
    #[default]
    Empty,
}

/// 请求配置的状态标签。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum RequestConfigState {
    Unknown,
    Allocated,
    #[default]
    Initialized,
}

/// 调用方描述“需要哪种数据集抽取”的参数。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestConfig {
    pub kind: RequestConfigKind,
    pub state: RequestConfigState,
    pub parameters: Bytes,
}

impl RequestConfig {
    /// 不携带任何参数的已初始化配置。
    pub fn empty() -> Self {
        Self::default()
    }

    /// 携带抽取参数的配置。
    pub fn with_parameters(parameters: impl Into<Bytes>) -> Self {
        Self {
            parameters: parameters.into(),
            ..Self::default()
        }
    }
}

opaque_payload! {
    /// 来自用户态的请求。
    UserRequest
}

opaque_payload! {
    /// 推送给用户态的通知。
    Notification
}

opaque_payload! {
    /// 模型给出的建议。
    Recommendation
}

opaque_payload! {
    /// 误差反向传播的反馈。
    BackpropagationFeedback
}
