#![allow(non_camel_case_types)]

use libc::{c_char, c_void};
use std::fmt;

// ===============================================================================================
// Handles & Result Codes
// ===============================================================================================

pub type ze_driver_handle_t = *mut c_void;
pub type ze_device_handle_t = *mut c_void;
pub type zes_mem_handle_t = *mut c_void;
pub type ze_bool_t = u8;

/// Raw `ze_result_t` value returned by every Level Zero entry point.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ZeResultCode(pub u32);

impl ZeResultCode {
    pub const SUCCESS: Self = Self(0);
    pub const NOT_READY: Self = Self(1);
    pub const ERROR_DEVICE_LOST: Self = Self(0x7000_0001);
    pub const ERROR_OUT_OF_HOST_MEMORY: Self = Self(0x7000_0002);
    pub const ERROR_OUT_OF_DEVICE_MEMORY: Self = Self(0x7000_0003);
    pub const ERROR_INSUFFICIENT_PERMISSIONS: Self = Self(0x7001_0000);
    pub const ERROR_NOT_AVAILABLE: Self = Self(0x7001_0001);
    pub const ERROR_UNINITIALIZED: Self = Self(0x7800_0001);
    pub const ERROR_UNSUPPORTED_VERSION: Self = Self(0x7800_0002);
    pub const ERROR_UNSUPPORTED_FEATURE: Self = Self(0x7800_0003);
    pub const ERROR_INVALID_ARGUMENT: Self = Self(0x7800_0004);
    pub const ERROR_INVALID_NULL_HANDLE: Self = Self(0x7800_0005);
    pub const ERROR_INVALID_NULL_POINTER: Self = Self(0x7800_0007);
    pub const ERROR_INVALID_SIZE: Self = Self(0x7800_0008);
    pub const ERROR_UNKNOWN: Self = Self(0x7fff_fffe);

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::SUCCESS => "ZE_RESULT_SUCCESS",
            Self::NOT_READY => "ZE_RESULT_NOT_READY",
            Self::ERROR_DEVICE_LOST => "ZE_RESULT_ERROR_DEVICE_LOST",
            Self::ERROR_OUT_OF_HOST_MEMORY => "ZE_RESULT_ERROR_OUT_OF_HOST_MEMORY",
            Self::ERROR_OUT_OF_DEVICE_MEMORY => "ZE_RESULT_ERROR_OUT_OF_DEVICE_MEMORY",
            Self::ERROR_INSUFFICIENT_PERMISSIONS => "ZE_RESULT_ERROR_INSUFFICIENT_PERMISSIONS",
            Self::ERROR_NOT_AVAILABLE => "ZE_RESULT_ERROR_NOT_AVAILABLE",
            Self::ERROR_UNINITIALIZED => "ZE_RESULT_ERROR_UNINITIALIZED",
            Self::ERROR_UNSUPPORTED_VERSION => "ZE_RESULT_ERROR_UNSUPPORTED_VERSION",
            Self::ERROR_UNSUPPORTED_FEATURE => "ZE_RESULT_ERROR_UNSUPPORTED_FEATURE",
            Self::ERROR_INVALID_ARGUMENT => "ZE_RESULT_ERROR_INVALID_ARGUMENT",
            Self::ERROR_INVALID_NULL_HANDLE => "ZE_RESULT_ERROR_INVALID_NULL_HANDLE",
            Self::ERROR_INVALID_NULL_POINTER => "ZE_RESULT_ERROR_INVALID_NULL_POINTER",
            Self::ERROR_INVALID_SIZE => "ZE_RESULT_ERROR_INVALID_SIZE",
            Self::ERROR_UNKNOWN => "ZE_RESULT_ERROR_UNKNOWN",
            _ => return None,
        })
    }
}

impl fmt::Display for ZeResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:x})", self.0),
            None => write!(f, "0x{:x}", self.0),
        }
    }
}

// ===============================================================================================
// Structure Types
// ===============================================================================================

pub const ZE_STRUCTURE_TYPE_DEVICE_PROPERTIES: u32 = 0x3;
pub const ZE_STRUCTURE_TYPE_COMMAND_QUEUE_GROUP_PROPERTIES: u32 = 0x6;
pub const ZE_STRUCTURE_TYPE_DEVICE_MEMORY_PROPERTIES: u32 = 0x7;

pub const ZES_STRUCTURE_TYPE_DEVICE_PROPERTIES: u32 = 0x1;
pub const ZES_STRUCTURE_TYPE_PCI_PROPERTIES: u32 = 0x2;
pub const ZES_STRUCTURE_TYPE_MEM_PROPERTIES: u32 = 0xb;
pub const ZES_STRUCTURE_TYPE_MEM_STATE: u32 = 0x1e;

pub const ZE_MAX_DEVICE_NAME: usize = 256;
pub const ZE_MAX_DEVICE_UUID_SIZE: usize = 16;
pub const ZES_STRING_PROPERTY_SIZE: usize = 64;

// ===============================================================================================
// Core Device Properties
// ===============================================================================================

pub const ZE_DEVICE_TYPE_GPU: u32 = 1;
pub const ZE_DEVICE_TYPE_CPU: u32 = 2;
pub const ZE_DEVICE_TYPE_FPGA: u32 = 3;
pub const ZE_DEVICE_TYPE_MCA: u32 = 4;
pub const ZE_DEVICE_TYPE_VPU: u32 = 5;

pub const ZE_DEVICE_PROPERTY_FLAG_INTEGRATED: u32 = 1 << 0;
pub const ZE_DEVICE_PROPERTY_FLAG_SUBDEVICE: u32 = 1 << 1;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct ze_device_properties_t {
    pub stype: u32,
    pub p_next: *mut c_void,
    pub type_: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    pub flags: u32,
    pub subdevice_id: u32,
    pub core_clock_rate: u32,
    pub max_mem_alloc_size: u64,
    pub max_hardware_contexts: u32,
    pub max_command_queue_priority: u32,
    pub num_threads_per_eu: u32,
    pub physical_eu_simd_width: u32,
    pub num_eus_per_subslice: u32,
    pub num_subslices_per_slice: u32,
    pub num_slices: u32,
    pub timer_resolution: u64,
    pub timestamp_valid_bits: u32,
    pub kernel_timestamp_valid_bits: u32,
    pub uuid: [u8; ZE_MAX_DEVICE_UUID_SIZE],
    pub name: [c_char; ZE_MAX_DEVICE_NAME],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct ze_command_queue_group_properties_t {
    pub stype: u32,
    pub p_next: *mut c_void,
    pub flags: u32,
    pub max_memory_fill_pattern_size: usize,
    pub num_queues: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct ze_device_memory_properties_t {
    pub stype: u32,
    pub p_next: *mut c_void,
    pub flags: u32,
    pub max_clock_rate: u32,
    pub max_bus_width: u32,
    pub total_size: u64,
    pub name: [c_char; ZE_MAX_DEVICE_NAME],
}

// ===============================================================================================
// Sysman
// ===============================================================================================

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct zes_device_properties_t {
    pub stype: u32,
    pub p_next: *mut c_void,
    pub core: ze_device_properties_t,
    pub num_subdevices: u32,
    pub serial_number: [c_char; ZES_STRING_PROPERTY_SIZE],
    pub board_number: [c_char; ZES_STRING_PROPERTY_SIZE],
    pub brand_name: [c_char; ZES_STRING_PROPERTY_SIZE],
    pub model_name: [c_char; ZES_STRING_PROPERTY_SIZE],
    pub vendor_name: [c_char; ZES_STRING_PROPERTY_SIZE],
    pub driver_version: [c_char; ZES_STRING_PROPERTY_SIZE],
}

pub const ZES_MEM_TYPE_HBM: u32 = 0;
pub const ZES_MEM_TYPE_DDR: u32 = 1;
pub const ZES_MEM_TYPE_DDR3: u32 = 2;
pub const ZES_MEM_TYPE_DDR4: u32 = 3;
pub const ZES_MEM_TYPE_DDR5: u32 = 4;
pub const ZES_MEM_TYPE_LPDDR: u32 = 5;
pub const ZES_MEM_TYPE_LPDDR3: u32 = 6;
pub const ZES_MEM_TYPE_LPDDR4: u32 = 7;
pub const ZES_MEM_TYPE_LPDDR5: u32 = 8;
pub const ZES_MEM_TYPE_SRAM: u32 = 9;
pub const ZES_MEM_TYPE_L1: u32 = 10;
pub const ZES_MEM_TYPE_L3: u32 = 11;
pub const ZES_MEM_TYPE_GRF: u32 = 12;
pub const ZES_MEM_TYPE_SLM: u32 = 13;
pub const ZES_MEM_TYPE_GDDR4: u32 = 14;
pub const ZES_MEM_TYPE_GDDR5: u32 = 15;
pub const ZES_MEM_TYPE_GDDR5X: u32 = 16;
pub const ZES_MEM_TYPE_GDDR6: u32 = 17;
pub const ZES_MEM_TYPE_GDDR6X: u32 = 18;
pub const ZES_MEM_TYPE_GDDR7: u32 = 19;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct zes_mem_properties_t {
    pub stype: u32,
    pub p_next: *mut c_void,
    pub type_: u32,
    pub on_subdevice: ze_bool_t,
    pub subdevice_id: u32,
    pub location: u32,
    pub physical_size: u64,
    pub bus_width: i32,
    pub num_channels: i32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct zes_mem_state_t {
    pub stype: u32,
    pub p_next: *const c_void,
    pub health: u32,
    pub free: u64,
    pub size: u64,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct zes_pci_address_t {
    pub domain: u32,
    pub bus: u32,
    pub device: u32,
    pub function: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct zes_pci_speed_t {
    pub generation: i32,
    pub width: i32,
    pub max_bandwidth: i64,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct zes_pci_properties_t {
    pub stype: u32,
    pub p_next: *mut c_void,
    pub address: zes_pci_address_t,
    pub max_speed: zes_pci_speed_t,
    pub have_bandwidth_counters: ze_bool_t,
    pub have_packet_counters: ze_bool_t,
    pub have_replay_counters: ze_bool_t,
}

// ===============================================================================================
// Default Initializers
// ===============================================================================================

// Every record handed to the driver must carry its `stype`; the rest starts zeroed.
macro_rules! zeroed_with_stype {
    ($($ty:ty => $stype:expr),* $(,)?) => {
        $(
            impl Default for $ty {
                fn default() -> Self {
                    // SAFETY: plain C record made of integers, byte arrays and a nullable pointer.
                    let mut value: Self = unsafe { std::mem::zeroed() };
                    value.stype = $stype;
                    value
                }
            }
        )*
    };
}

zeroed_with_stype! {
    ze_device_properties_t => ZE_STRUCTURE_TYPE_DEVICE_PROPERTIES,
    ze_command_queue_group_properties_t => ZE_STRUCTURE_TYPE_COMMAND_QUEUE_GROUP_PROPERTIES,
    ze_device_memory_properties_t => ZE_STRUCTURE_TYPE_DEVICE_MEMORY_PROPERTIES,
    zes_mem_properties_t => ZES_STRUCTURE_TYPE_MEM_PROPERTIES,
    zes_mem_state_t => ZES_STRUCTURE_TYPE_MEM_STATE,
    zes_pci_properties_t => ZES_STRUCTURE_TYPE_PCI_PROPERTIES,
}

impl Default for zes_device_properties_t {
    fn default() -> Self {
        // SAFETY: see above.
        let mut value: Self = unsafe { std::mem::zeroed() };
        value.stype = ZES_STRUCTURE_TYPE_DEVICE_PROPERTIES;
        value.core = ze_device_properties_t::default();
        value
    }
}

// ===============================================================================================
// Entry Points
// ===============================================================================================

pub type ZeInitFn = unsafe extern "C" fn(flags: u32) -> ZeResultCode;
pub type ZeDriverGetFn =
    unsafe extern "C" fn(count: *mut u32, drivers: *mut ze_driver_handle_t) -> ZeResultCode;
pub type ZeDeviceGetFn = unsafe extern "C" fn(
    driver: ze_driver_handle_t,
    count: *mut u32,
    devices: *mut ze_device_handle_t,
) -> ZeResultCode;
pub type ZeDeviceGetSubDevicesFn = unsafe extern "C" fn(
    device: ze_device_handle_t,
    count: *mut u32,
    subdevices: *mut ze_device_handle_t,
) -> ZeResultCode;
pub type ZeDeviceGetPropertiesFn = unsafe extern "C" fn(
    device: ze_device_handle_t,
    props: *mut ze_device_properties_t,
) -> ZeResultCode;
pub type ZeDeviceGetCommandQueueGroupPropertiesFn = unsafe extern "C" fn(
    device: ze_device_handle_t,
    count: *mut u32,
    props: *mut ze_command_queue_group_properties_t,
) -> ZeResultCode;
pub type ZeDeviceGetMemoryPropertiesFn = unsafe extern "C" fn(
    device: ze_device_handle_t,
    count: *mut u32,
    props: *mut ze_device_memory_properties_t,
) -> ZeResultCode;
pub type ZesDeviceGetPropertiesFn = unsafe extern "C" fn(
    device: ze_device_handle_t,
    props: *mut zes_device_properties_t,
) -> ZeResultCode;
pub type ZesDeviceEnumMemoryModulesFn = unsafe extern "C" fn(
    device: ze_device_handle_t,
    count: *mut u32,
    modules: *mut zes_mem_handle_t,
) -> ZeResultCode;
pub type ZesMemoryGetPropertiesFn =
    unsafe extern "C" fn(memory: zes_mem_handle_t, props: *mut zes_mem_properties_t) -> ZeResultCode;
pub type ZesMemoryGetStateFn =
    unsafe extern "C" fn(memory: zes_mem_handle_t, state: *mut zes_mem_state_t) -> ZeResultCode;
pub type ZesDevicePciGetPropertiesFn = unsafe extern "C" fn(
    device: ze_device_handle_t,
    props: *mut zes_pci_properties_t,
) -> ZeResultCode;
