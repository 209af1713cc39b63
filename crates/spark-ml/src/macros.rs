//! crate 内部宏工具集。
//!
//! - [`atomic_tag_cell!`]：为 `#[repr(u8)]` 标签枚举生成原子单元，承载 Mode / LifecycleState 等独立轴；
//! - [`opaque_payload!`]：生成不透明字节负载类型，核心只负责搬运，不解释其内容。

/// 为标签枚举生成基于 `AtomicU8` 的原子单元。
///
/// # 契约说明（What）
/// - 目标枚举必须是 `Copy`，可 `as u8` 转换，并提供 `const fn from_u8(u8) -> Self`；
/// - 生成的单元提供 `load`/`store`/`swap`/`compare_exchange`，全部使用 Acquire/Release 语义，
///   保证状态标签与其之前发布的数据之间的先后可见性。
///
/// # 风险提示（Trade-offs）
/// - `from_u8` 对未知取值必须回落到某个确定变体，否则 `load` 无法保持全函数；
/// - 原子类型取自 `crate::sync`，启用 `--cfg spark_loom` 时换成 Loom 实现，模型检查直接覆盖生成的单元。
macro_rules! atomic_tag_cell {
    ($(#[$meta:meta])* $vis:vis struct $cell:ident($tag:ty);) => {
        $(#[$meta])*
        $vis struct $cell {
            raw: $crate::sync::AtomicU8,
        }

        impl $cell {
            /// 以给定标签构造原子单元。
            #[cfg(not(any(loom, spark_loom)))]
            pub const fn new(tag: $tag) -> Self {
                Self {
                    raw: $crate::sync::AtomicU8::new(tag as u8),
                }
            }

            /// 以给定标签构造原子单元（Loom 的原子类型不提供 `const` 构造）。
            #[cfg(any(loom, spark_loom))]
            pub fn new(tag: $tag) -> Self {
                Self {
                    raw: $crate::sync::AtomicU8::new(tag as u8),
                }
            }

            /// 读取当前标签。
            pub fn load(&self) -> $tag {
                <$tag>::from_u8(self.raw.load($crate::sync::Ordering::Acquire))
            }

            /// 覆盖写入标签。
            pub fn store(&self, tag: $tag) {
                self.raw.store(tag as u8, $crate::sync::Ordering::Release);
            }

            /// 写入新标签并返回旧标签。
            #[allow(dead_code)]
            pub fn swap(&self, tag: $tag) -> $tag {
                <$tag>::from_u8(self.raw.swap(tag as u8, $crate::sync::Ordering::AcqRel))
            }

            /// 仅当当前标签等于 `current` 时写入 `next`。
            #[allow(dead_code)]
            pub fn compare_exchange(&self, current: $tag, next: $tag) -> Result<$tag, $tag> {
                self.raw
                    .compare_exchange(
                        current as u8,
                        next as u8,
                        $crate::sync::Ordering::AcqRel,
                        $crate::sync::Ordering::Acquire,
                    )
                    .map(<$tag>::from_u8)
                    .map_err(<$tag>::from_u8)
            }
        }

        impl ::core::fmt::Debug for $cell {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_tuple(stringify!($cell)).field(&self.load()).finish()
            }
        }
    };
}

/// 生成不透明字节负载类型。
///
/// 扩展点的请求、通知、建议与反馈在核心中只做透传：具体编码属于挂载模型的一方，
/// 因此这里统一以 [`bytes::Bytes`] 承载，克隆仅增加引用计数。
macro_rules! opaque_payload {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq)]
        pub struct $name {
            payload: ::bytes::Bytes,
        }

        impl $name {
            /// 以任意字节内容构造负载。
            pub fn new(payload: impl Into<::bytes::Bytes>) -> Self {
                Self {
                    payload: payload.into(),
                }
            }

            /// 空负载。
            pub fn empty() -> Self {
                Self::default()
            }

            /// 负载字节视图。
            pub fn payload(&self) -> &::bytes::Bytes {
                &self.payload
            }

            /// 负载是否为空。
            pub fn is_empty(&self) -> bool {
                self.payload.is_empty()
            }
        }
    };
}

pub(crate) use atomic_tag_cell;
pub(crate) use opaque_payload;
