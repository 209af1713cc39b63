//! 模型的两条独立状态轴：生命周期阶段与信任模式。

use core::fmt;

use crate::macros::atomic_tag_cell;

/// 生命周期阶段。
///
/// ```text
/// Unknown → Created → Initialized → Started → Running → ShuttingDown → Terminal
///                                      ↘ Stopped ↗
/// ```
///
/// - `Terminal` 不可重入：除 `destroy` 外的所有操作返回 `Unsupported`；
/// - `ShuttingDown` 只在 `destroy` 持有生命周期栅栏期间可见。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum LifecycleState {
    #[default]
    Unknown = 0,
    Created = 1,
    Initialized = 2,
    Started = 3,
    Running = 4,
    Stopped = 5,
    ShuttingDown = 6,
    Terminal = 7,
}

impl LifecycleState {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LifecycleState::Created,
            2 => LifecycleState::Initialized,
            3 => LifecycleState::Started,
            4 => LifecycleState::Running,
            5 => LifecycleState::Stopped,
            6 => LifecycleState::ShuttingDown,
            7 => LifecycleState::Terminal,
            _ => LifecycleState::Unknown,
        }
    }

    /// 已完成 `create` 且尚未进入拆卸。
    pub const fn is_live(self) -> bool {
        matches!(
            self,
            LifecycleState::Created
                | LifecycleState::Initialized
                | LifecycleState::Started
                | LifecycleState::Running
                | LifecycleState::Stopped
        )
    }

    /// 是否已经开始或完成拆卸。
    pub const fn is_tearing_down(self) -> bool {
        matches!(self, LifecycleState::ShuttingDown | LifecycleState::Terminal)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Unknown => "unknown",
            LifecycleState::Created => "created",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Started => "started",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Terminal => "terminal",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 信任模式，与生命周期阶段独立变化。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Mode {
    #[default]
    Unknown = 0,
    /// 模型不可信，宿主只采用保守默认行为。
    Emergency = 1,
    Learning = 2,
    Collaboration = 3,
    Recommendation = 4,
}

impl Mode {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Mode::Emergency,
            2 => Mode::Learning,
            3 => Mode::Collaboration,
            4 => Mode::Recommendation,
            _ => Mode::Unknown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Unknown => "unknown",
            Mode::Emergency => "emergency",
            Mode::Learning => "learning",
            Mode::Collaboration => "collaboration",
            Mode::Recommendation => "recommendation",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

atomic_tag_cell! {
    /// 生命周期阶段的原子单元。
    pub struct AtomicLifecycleState(LifecycleState);
}

impl AtomicLifecycleState {
    /// 把存活阶段推进到 `target`，返回推进前的阶段。
    ///
    /// - 以 CAS 循环完成：与之竞争的 `store`（例如 stop 或 destroy）总是胜出，
    ///   推进不会覆盖它写入的阶段；
    /// - 当前阶段已是 `target` 或不处于存活区间时返回 `None`，不做任何写入。
    pub fn advance_live_to(&self, target: LifecycleState) -> Option<LifecycleState> {
        let mut observed = self.load();
        while observed.is_live() && observed != target {
            match self.compare_exchange(observed, target) {
                Ok(previous) => return Some(previous),
                Err(actual) => observed = actual,
            }
        }
        None
    }
}

atomic_tag_cell! {
    /// 信任模式的原子单元。
    pub(crate) struct AtomicMode(Mode);
}
