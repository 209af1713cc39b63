//! 测试设备演示：挂载模型、读写缓冲区、经控制通道下发命令并打印设备报告。
//!
//! 日志级别由 `RUST_LOG` 控制，缺省为 `info`。

use anyhow::{Context, Result};
use spark_ml::{RequestConfig, UserRequest};
use spark_ml_testdev::{DeviceControl, TestDevice};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let device = TestDevice::attach().context("attach test device")?;

    let mut handle = device.open();
    let written = handle
        .write(b"Hello from the ML library test device")
        .context("write payload")?;
    handle.seek(0);
    let mut echo = vec![0u8; written];
    let read = handle.read(&mut echo);
    info!(
        written,
        read,
        echo = %String::from_utf8_lossy(&echo[..read]),
        "buffer round trip"
    );
    info!(data_size = device.ioctl(DeviceControl::GetSize)?, "queried data size");

    if let Err(err) = device.control().write(b"start\n") {
        warn!(code = err.code(), error = %err, "model declined start");
    }

    let dataset = device
        .model()
        .get_dataset(&RequestConfig::empty(), &UserRequest::empty())
        .context("fetch dataset")?;
    info!(
        state = %dataset.state(),
        portion = ?dataset.portion(),
        lifecycle = %device.model().state(),
        "dataset ready"
    );

    print!("{}", device.stats());
    print!("{}", device.report());

    device.shutdown();
    Ok(())
}
