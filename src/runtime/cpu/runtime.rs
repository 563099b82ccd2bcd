//! CPU runtime type

use super::client::CpuClient;
use super::device::CpuDevice;
use crate::runtime::Runtime;

/// CPU compute backend
#[derive(Clone, Debug)]
pub struct CpuRuntime;

impl Runtime for CpuRuntime {
    type Device = CpuDevice;
    type Client = CpuClient;

    fn name() -> &'static str {
        "cpu"
    }

    fn default_device() -> CpuDevice {
        CpuDevice::new()
    }

    fn default_client(device: &CpuDevice) -> CpuClient {
        CpuClient::new(device.clone())
    }
}
