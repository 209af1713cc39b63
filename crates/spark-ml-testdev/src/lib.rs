#![deny(unsafe_code)]

//! # spark-ml-testdev：进程内测试设备
//!
//! ## 核心意图（Why）
//! - 以一个带固定缓冲区的字符设备作为模型宿主，驱动 `spark-ml` 走完挂载、控制与拆卸；
//! - 设备的计数器与文本报告是端到端测试唯一需要观察的表面。
//!
//! ## 行为契约（What）
//! - 缓冲区容量固定为 [`BUFFER_SIZE`]；`write` 起点越过容量返回 `NoSpace`，
//!   `read` 起点越过已写数据返回 0 字节；
//! - 构造时以 [`MODEL_NAME`] 挂载模型（先 create 再 init），init 失败会先拆卸模型再返回错误；
//! - [`TestDevice::shutdown`] 与 `Drop` 都会拆卸模型，重复拆卸是空操作。
//!
//! ## 风险提示（Trade-offs）
//! - 缓冲区与数据长度由同一把互斥锁保护，计数器使用独立原子量，
//!   因此 [`TestDevice::stats`] 给出的三项计数不保证来自同一时刻。

use core::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use spark_ml::alloc::allocate_default;
use spark_ml::{
    ControlChannel, InMemoryRegistry, Model, ModelOptions, OperationTable, ParentHandle, Registry,
};
use tracing::{debug, info, warn};

pub mod error;

pub use error::{DeviceError, Result};

/// 设备名，同时作为模型的父挂载点。
pub const DEVICE_NAME: &str = "mllibdev";
/// 模型所属子系统名。
pub const SUBSYSTEM_NAME: &str = "ml_lib_test";
/// 设备挂载的模型名。
pub const MODEL_NAME: &str = "ml_model1";
/// 缓冲区容量（字节）。
pub const BUFFER_SIZE: usize = 1024;

/// 设备控制请求。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceControl {
    /// 清零缓冲区并把数据长度置 0。
    Reset,
    /// 查询数据长度。
    GetSize,
    /// 直接设置数据长度，不得超过容量。
    SetSize(usize),
}

struct DeviceBuffer {
    bytes: Box<[u8]>,
    data_size: usize,
}

/// 进程内测试设备。
///
/// # 教案式说明
/// - **意图 (Why)**：复刻字符设备的读写、控制请求与属性文件，让模型在真实的“宿主驱动”下被调用；
/// - **逻辑 (How)**：读写按位置操作共享缓冲区；模型经 [`ControlChannel`] 暴露控制入口；
/// - **契约 (What)**：`TestDevice: Send + Sync`，可被多个 [`DeviceHandle`] 并发使用。
pub struct TestDevice {
    buffer: Mutex<DeviceBuffer>,
    access_count: AtomicU64,
    read_count: AtomicU64,
    write_count: AtomicU64,
    control: ControlChannel,
}

impl TestDevice {
    /// 以私有内存注册表和通用分发表挂载设备。
    pub fn attach() -> Result<Self> {
        Self::attach_with(Arc::new(InMemoryRegistry::new()), None)
    }

    /// 以给定注册表挂载设备；`operations` 为 `None` 时模型使用共享的通用分发表。
    ///
    /// # 错误
    /// - create 失败：模型未挂载，错误原样返回；
    /// - init 失败：模型先被拆卸，再返回 init 的错误。
    pub fn attach_with(
        registry: Arc<dyn Registry>,
        operations: Option<OperationTable>,
    ) -> Result<Self> {
        let mut builder = Model::builder()
            .subsystem_name(SUBSYSTEM_NAME)
            .model_name(MODEL_NAME)
            .parent_handle(ParentHandle::new(DEVICE_NAME))
            .registry(registry);
        if let Some(table) = operations {
            builder = builder.operations(table);
        }
        let model = Arc::new(builder.build());

        model.create()?;
        let initialized =
            allocate_default::<ModelOptions>().and_then(|options| model.init(options));
        if let Err(err) = initialized {
            warn!(device = DEVICE_NAME, error = %err, "model init failed; detaching");
            model.destroy();
            return Err(err.into());
        }

        info!(
            device = DEVICE_NAME,
            model = MODEL_NAME,
            buffer_size = BUFFER_SIZE,
            "test device attached"
        );
        Ok(Self {
            buffer: Mutex::new(DeviceBuffer {
                bytes: vec![0; BUFFER_SIZE].into_boxed_slice(),
                data_size: 0,
            }),
            access_count: AtomicU64::new(0),
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            control: ControlChannel::new(model),
        })
    }

    /// 打开设备，访问计数加一。
    pub fn open(&self) -> DeviceHandle<'_> {
        let opened = self.access_count.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(device = DEVICE_NAME, access_count = opened, "device opened");
        DeviceHandle {
            device: self,
            position: 0,
        }
    }

    /// 从 `position` 读取至多 `out.len()` 字节，返回实际读取数；越过已写数据返回 0。
    pub fn read_at(&self, position: usize, out: &mut [u8]) -> usize {
        let buffer = self.buffer.lock();
        if position >= buffer.data_size {
            return 0;
        }
        let count = out.len().min(buffer.data_size - position);
        out[..count].copy_from_slice(&buffer.bytes[position..position + count]);
        drop(buffer);
        self.read_count.fetch_add(1, Ordering::Relaxed);
        count
    }

    /// 在 `position` 写入至多剩余容量的字节，返回实际写入数并按需扩展数据长度。
    pub fn write_at(&self, position: usize, data: &[u8]) -> Result<usize> {
        let mut buffer = self.buffer.lock();
        if position >= BUFFER_SIZE {
            return Err(DeviceError::NoSpace {
                position,
                capacity: BUFFER_SIZE,
            });
        }
        let count = data.len().min(BUFFER_SIZE - position);
        buffer.bytes[position..position + count].copy_from_slice(&data[..count]);
        buffer.data_size = buffer.data_size.max(position + count);
        drop(buffer);
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(count)
    }

    /// 执行控制请求，返回请求完成后的数据长度。
    pub fn ioctl(&self, request: DeviceControl) -> Result<usize> {
        match request {
            DeviceControl::Reset => {
                let mut buffer = self.buffer.lock();
                buffer.bytes.fill(0);
                buffer.data_size = 0;
                info!(device = DEVICE_NAME, "buffer reset");
                Ok(0)
            }
            DeviceControl::GetSize => Ok(self.data_size()),
            DeviceControl::SetSize(size) if size > BUFFER_SIZE => {
                Err(DeviceError::InvalidArgument {
                    detail: format!("data size {size} exceeds the {BUFFER_SIZE} byte buffer"),
                })
            }
            DeviceControl::SetSize(size) => {
                self.buffer.lock().data_size = size;
                info!(device = DEVICE_NAME, data_size = size, "data size set");
                Ok(size)
            }
        }
    }

    pub fn buffer_size(&self) -> usize {
        BUFFER_SIZE
    }

    pub fn data_size(&self) -> usize {
        self.buffer.lock().data_size
    }

    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// `stats` 属性文件内容。
    pub fn stats(&self) -> String {
        format!(
            "Opens: {}\nReads: {}\nWrites: {}\n",
            self.access_count(),
            self.read_count(),
            self.write_count()
        )
    }

    /// 设备信息报告，逐行对齐的键值表。
    pub fn report(&self) -> String {
        let mut out = String::from("ML Library Testing Device Driver Information\n");
        out.push_str("=================================\n");
        let rows: [(&str, String); 6] = [
            ("Device name:", DEVICE_NAME.to_owned()),
            ("Buffer size:", format!("{BUFFER_SIZE} bytes")),
            ("Data size:", format!("{} bytes", self.data_size())),
            ("Access count:", self.access_count().to_string()),
            ("Read count:", self.read_count().to_string()),
            ("Write count:", self.write_count().to_string()),
        ];
        for (label, value) in rows {
            // 写入 String 不会失败。
            let _ = writeln!(out, "{label:<17}{value}");
        }
        out
    }

    /// 挂载的模型。
    pub fn model(&self) -> &Arc<Model> {
        self.control.model()
    }

    /// 模型的控制通道。
    pub fn control(&self) -> &ControlChannel {
        &self.control
    }

    /// 拆卸模型；之后模型的所有操作返回 `Unsupported`，设备读写不受影响。
    pub fn shutdown(&self) {
        info!(device = DEVICE_NAME, model = MODEL_NAME, "detaching model");
        self.model().destroy();
    }
}

impl Drop for TestDevice {
    fn drop(&mut self) {
        self.model().destroy();
    }
}

/// 打开设备得到的句柄，维护自身的读写位置。
pub struct DeviceHandle<'a> {
    device: &'a TestDevice,
    position: usize,
}

impl DeviceHandle<'_> {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// 从当前位置读取并前移位置。
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let count = self.device.read_at(self.position, out);
        self.position += count;
        count
    }

    /// 从当前位置写入并前移位置。
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let count = self.device.write_at(self.position, data)?;
        self.position += count;
        Ok(count)
    }
}
