use crate::error::ZeResult;
use crate::ze::ffi::{
    ZE_DEVICE_PROPERTY_FLAG_INTEGRATED, ZE_DEVICE_PROPERTY_FLAG_SUBDEVICE, ZE_DEVICE_TYPE_CPU,
    ZE_DEVICE_TYPE_FPGA, ZE_DEVICE_TYPE_GPU, ZE_DEVICE_TYPE_MCA, ZE_DEVICE_TYPE_VPU,
    ZES_MEM_TYPE_DDR, ZES_MEM_TYPE_DDR3, ZES_MEM_TYPE_DDR4, ZES_MEM_TYPE_DDR5, ZES_MEM_TYPE_HBM,
    ZES_MEM_TYPE_LPDDR, ZES_MEM_TYPE_LPDDR3, ZES_MEM_TYPE_LPDDR4, ZES_MEM_TYPE_LPDDR5,
};
use std::fmt;

// ===============================================================================================
// Opaque Handles
// ===============================================================================================

macro_rules! opaque_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
            pub struct $name(usize);

            impl $name {
                #[must_use]
                pub const fn from_raw(raw: usize) -> Self {
                    Self(raw)
                }

                #[must_use]
                pub const fn as_raw(self) -> usize {
                    self.0
                }
            }
        )*
    };
}

opaque_handle! {
    /// A Level Zero driver (`ze_driver_handle_t`).
    DriverHandle,
    /// A device or subdevice (`ze_device_handle_t`, also valid as a Sysman handle).
    DeviceHandle,
    /// A Sysman memory module (`zes_mem_handle_t`).
    MemoryHandle,
}

// ===============================================================================================
// Typed Records
// ===============================================================================================

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceType {
    Gpu,
    Cpu,
    Fpga,
    Mca,
    Vpu,
    Other(u32),
}

impl DeviceType {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            ZE_DEVICE_TYPE_GPU => Self::Gpu,
            ZE_DEVICE_TYPE_CPU => Self::Cpu,
            ZE_DEVICE_TYPE_FPGA => Self::Fpga,
            ZE_DEVICE_TYPE_MCA => Self::Mca,
            ZE_DEVICE_TYPE_VPU => Self::Vpu,
            other => Self::Other(other),
        }
    }

    /// Display label; vendor values outside the known set map to `"Unknown"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gpu => "GPU",
            Self::Cpu => "CPU",
            Self::Fpga => "FPGA",
            Self::Mca => "MCA",
            Self::Vpu => "VPU",
            Self::Other(_) => "Unknown",
        }
    }
}

/// Core API device properties (`zeDeviceGetProperties`).
#[derive(Debug, Clone)]
pub struct DeviceProperties {
    pub device_type: DeviceType,
    pub vendor_id: u32,
    pub device_id: u32,
    pub flags: u32,
    pub subdevice_id: u32,
    pub num_threads_per_eu: u32,
    pub num_eus_per_subslice: u32,
    pub num_subslices_per_slice: u32,
    pub num_slices: u32,
    pub name: String,
}

impl DeviceProperties {
    #[must_use]
    pub const fn is_integrated(&self) -> bool {
        self.flags & ZE_DEVICE_PROPERTY_FLAG_INTEGRATED != 0
    }

    #[must_use]
    pub const fn is_subdevice(&self) -> bool {
        self.flags & ZE_DEVICE_PROPERTY_FLAG_SUBDEVICE != 0
    }
}

/// Sysman identity strings (`zesDeviceGetProperties`).
#[derive(Debug, Clone, Default)]
pub struct SysmanProperties {
    pub num_subdevices: u32,
    pub serial_number: String,
    pub board_number: String,
    pub brand_name: String,
    pub model_name: String,
    pub vendor_name: String,
    pub driver_version: String,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct QueueGroupProperties {
    pub flags: u32,
    pub max_memory_fill_pattern_size: usize,
    pub num_queues: u32,
}

/// Core API memory description (`zeDeviceGetMemoryProperties`).
#[derive(Debug, Clone, Default)]
pub struct DeviceMemoryProperties {
    pub flags: u32,
    pub max_clock_rate: u32,
    pub max_bus_width: u32,
    pub total_size: u64,
    pub name: String,
}

/// Broad memory kind a Sysman module type falls into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    Hbm,
    Ddr,
    Other,
}

impl MemoryKind {
    #[must_use]
    pub const fn from_raw_type(raw: u32) -> Self {
        match raw {
            ZES_MEM_TYPE_HBM => Self::Hbm,
            ZES_MEM_TYPE_DDR | ZES_MEM_TYPE_DDR3 | ZES_MEM_TYPE_DDR4 | ZES_MEM_TYPE_DDR5
            | ZES_MEM_TYPE_LPDDR | ZES_MEM_TYPE_LPDDR3 | ZES_MEM_TYPE_LPDDR4
            | ZES_MEM_TYPE_LPDDR5 => Self::Ddr,
            _ => Self::Other,
        }
    }

    /// Fragment used in `LevelZero<Kind>Size` attribute names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hbm => "HBM",
            Self::Ddr => "DDR",
            Self::Other => "Memory",
        }
    }
}

/// Sysman memory module description (`zesMemoryGetProperties`).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MemoryModuleProperties {
    pub mem_type: u32,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub location: u32,
    pub physical_size: u64,
    pub bus_width: i32,
    pub num_channels: i32,
}

impl MemoryModuleProperties {
    #[must_use]
    pub const fn kind(&self) -> MemoryKind {
        MemoryKind::from_raw_type(self.mem_type)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MemoryModuleState {
    pub health: u32,
    pub free: u64,
    pub size: u64,
}

/// PCI location of a device, as `domain:bus:device.function`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PciAddress {
    pub domain: u32,
    pub bus: u32,
    pub device: u32,
    pub function: u32,
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:01x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PciProperties {
    pub address: PciAddress,
    pub generation: i32,
    pub width: i32,
    /// Maximum bandwidth in bytes per second; negative or zero when unknown.
    pub max_bandwidth: i64,
}

// ===============================================================================================
// Capability Provider
// ===============================================================================================

/// The subset of the Level Zero core and Sysman APIs that discovery consumes.
///
/// Every variable-length query returns the complete list; implementations hide the
/// two-phase count/fill protocol of the C API.
pub trait LevelZero {
    fn init(&self) -> ZeResult<()>;

    fn drivers(&self) -> ZeResult<Vec<DriverHandle>>;

    fn devices(&self, driver: DriverHandle) -> ZeResult<Vec<DeviceHandle>>;

    /// Subdevices of `device`. Drivers report `ERROR_INVALID_ARGUMENT` for devices without any.
    fn subdevices(&self, device: DeviceHandle) -> ZeResult<Vec<DeviceHandle>>;

    fn device_properties(&self, device: DeviceHandle) -> ZeResult<DeviceProperties>;

    fn command_queue_groups(&self, device: DeviceHandle) -> ZeResult<Vec<QueueGroupProperties>>;

    fn memory_properties(&self, device: DeviceHandle) -> ZeResult<Vec<DeviceMemoryProperties>>;

    fn sysman_properties(&self, device: DeviceHandle) -> ZeResult<SysmanProperties>;

    fn memory_modules(&self, device: DeviceHandle) -> ZeResult<Vec<MemoryHandle>>;

    fn memory_module_properties(&self, module: MemoryHandle) -> ZeResult<MemoryModuleProperties>;

    fn memory_module_state(&self, module: MemoryHandle) -> ZeResult<MemoryModuleState>;

    fn pci_properties(&self, device: DeviceHandle) -> ZeResult<PciProperties>;
}
