use crate::error::{ZeError, ZeResult};
use crate::utils::fixed_cstr_to_string;
use crate::ze::api::{
    DeviceHandle, DeviceMemoryProperties, DeviceProperties, DeviceType, DriverHandle, LevelZero,
    MemoryHandle, MemoryModuleProperties, MemoryModuleState, PciAddress, PciProperties,
    QueueGroupProperties, SysmanProperties,
};
use crate::ze::ffi::{
    ZeDeviceGetCommandQueueGroupPropertiesFn, ZeDeviceGetFn, ZeDeviceGetMemoryPropertiesFn,
    ZeDeviceGetPropertiesFn, ZeDeviceGetSubDevicesFn, ZeDriverGetFn, ZeInitFn, ZeResultCode,
    ZesDeviceEnumMemoryModulesFn, ZesDeviceGetPropertiesFn, ZesDevicePciGetPropertiesFn,
    ZesMemoryGetPropertiesFn, ZesMemoryGetStateFn, ze_command_queue_group_properties_t,
    ze_device_handle_t, ze_device_memory_properties_t, ze_device_properties_t,
    ze_driver_handle_t, zes_device_properties_t, zes_mem_handle_t, zes_mem_properties_t,
    zes_mem_state_t, zes_pci_properties_t,
};
use libloading::Library;
use std::env;
use std::ptr;

/// Environment override for the loader library location.
pub const LOADER_PATH_ENV: &str = "ZE_TOPO_LOADER_PATH";
const DEFAULT_LOADER_PATH: &str = "libze_loader.so.1";

fn check(call: &'static str, code: ZeResultCode) -> ZeResult<()> {
    if code.is_success() {
        Ok(())
    } else {
        Err(ZeError::Call { call, code })
    }
}

/// Runs the Level Zero "query count, allocate, query again" protocol.
///
/// `query` is invoked first with a null buffer to learn the count, then with a buffer of
/// `count` copies of `proto`. The count written by the second call is trusted and truncates
/// the result.
pub fn enumerate<T: Clone>(
    call: &'static str,
    proto: T,
    mut query: impl FnMut(&mut u32, *mut T) -> ZeResultCode,
) -> ZeResult<Vec<T>> {
    let mut count = 0u32;
    check(call, query(&mut count, ptr::null_mut()))?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut items = vec![proto; count as usize];
    check(call, query(&mut count, items.as_mut_ptr()))?;
    items.truncate(count as usize);
    Ok(items)
}

#[derive(Debug)]
struct EntryPoints {
    init: ZeInitFn,
    driver_get: ZeDriverGetFn,
    device_get: ZeDeviceGetFn,
    device_get_sub_devices: ZeDeviceGetSubDevicesFn,
    device_get_properties: ZeDeviceGetPropertiesFn,
    device_get_cq_group_properties: ZeDeviceGetCommandQueueGroupPropertiesFn,
    device_get_memory_properties: ZeDeviceGetMemoryPropertiesFn,
    // Sysman entry points are absent from very old loaders.
    sysman_device_get_properties: Option<ZesDeviceGetPropertiesFn>,
    sysman_enum_memory_modules: Option<ZesDeviceEnumMemoryModulesFn>,
    sysman_memory_get_properties: Option<ZesMemoryGetPropertiesFn>,
    sysman_memory_get_state: Option<ZesMemoryGetStateFn>,
    sysman_pci_get_properties: Option<ZesDevicePciGetPropertiesFn>,
}

/// A dynamically loaded Level Zero loader (`libze_loader`).
///
/// Entry points are resolved once at load time; the library stays mapped for the
/// lifetime of this value.
#[derive(Debug)]
pub struct ZeLoader {
    fns: EntryPoints,
    _lib: Library,
}

impl ZeLoader {
    /// Opens the loader from `ZE_TOPO_LOADER_PATH`, or the system default.
    ///
    /// # Errors
    /// Returns an error if the library cannot be loaded or lacks a core entry point.
    pub fn open() -> ZeResult<Self> {
        let path = env::var(LOADER_PATH_ENV).unwrap_or_else(|_| DEFAULT_LOADER_PATH.to_string());
        Self::open_path(&path)
    }

    /// Opens the loader at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the library cannot be loaded or lacks a core entry point.
    pub fn open_path(path: &str) -> ZeResult<Self> {
        tracing::debug!("Loading Level Zero loader from {}", path);
        // SAFETY: loading the vendor loader runs its initializers, which is the documented
        // way to use it.
        let lib = unsafe { Library::new(path) }.map_err(|source| ZeError::Load {
            path: path.to_string(),
            source,
        })?;

        // SAFETY: each symbol is looked up with the signature from ze_api.h / zes_api.h.
        let fns = unsafe {
            EntryPoints {
                init: required(&lib, b"zeInit\0", "zeInit")?,
                driver_get: required(&lib, b"zeDriverGet\0", "zeDriverGet")?,
                device_get: required(&lib, b"zeDeviceGet\0", "zeDeviceGet")?,
                device_get_sub_devices: required(
                    &lib,
                    b"zeDeviceGetSubDevices\0",
                    "zeDeviceGetSubDevices",
                )?,
                device_get_properties: required(
                    &lib,
                    b"zeDeviceGetProperties\0",
                    "zeDeviceGetProperties",
                )?,
                device_get_cq_group_properties: required(
                    &lib,
                    b"zeDeviceGetCommandQueueGroupProperties\0",
                    "zeDeviceGetCommandQueueGroupProperties",
                )?,
                device_get_memory_properties: required(
                    &lib,
                    b"zeDeviceGetMemoryProperties\0",
                    "zeDeviceGetMemoryProperties",
                )?,
                sysman_device_get_properties: optional(&lib, b"zesDeviceGetProperties\0"),
                sysman_enum_memory_modules: optional(&lib, b"zesDeviceEnumMemoryModules\0"),
                sysman_memory_get_properties: optional(&lib, b"zesMemoryGetProperties\0"),
                sysman_memory_get_state: optional(&lib, b"zesMemoryGetState\0"),
                sysman_pci_get_properties: optional(&lib, b"zesDevicePciGetProperties\0"),
            }
        };

        Ok(Self { fns, _lib: lib })
    }
}

unsafe fn required<T: Copy>(lib: &Library, symbol: &[u8], name: &'static str) -> ZeResult<T> {
    unsafe { lib.get::<T>(symbol) }
        .map(|sym| *sym)
        .map_err(|_| ZeError::MissingSymbol(name))
}

unsafe fn optional<T: Copy>(lib: &Library, symbol: &[u8]) -> Option<T> {
    unsafe { lib.get::<T>(symbol) }.ok().map(|sym| *sym)
}

fn driver_ptr(handle: DriverHandle) -> ze_driver_handle_t {
    handle.as_raw() as ze_driver_handle_t
}

fn device_ptr(handle: DeviceHandle) -> ze_device_handle_t {
    handle.as_raw() as ze_device_handle_t
}

fn memory_ptr(handle: MemoryHandle) -> zes_mem_handle_t {
    handle.as_raw() as zes_mem_handle_t
}

fn convert_device_properties(raw: &ze_device_properties_t) -> DeviceProperties {
    DeviceProperties {
        device_type: DeviceType::from_raw(raw.type_),
        vendor_id: raw.vendor_id,
        device_id: raw.device_id,
        flags: raw.flags,
        subdevice_id: raw.subdevice_id,
        num_threads_per_eu: raw.num_threads_per_eu,
        num_eus_per_subslice: raw.num_eus_per_subslice,
        num_subslices_per_slice: raw.num_subslices_per_slice,
        num_slices: raw.num_slices,
        name: fixed_cstr_to_string(&raw.name),
    }
}

impl LevelZero for ZeLoader {
    fn init(&self) -> ZeResult<()> {
        // SAFETY: plain call with flags 0 (all driver types).
        check("zeInit", unsafe { (self.fns.init)(0) })
    }

    fn drivers(&self) -> ZeResult<Vec<DriverHandle>> {
        let raw = enumerate("zeDriverGet", ptr::null_mut(), |count, buf| {
            // SAFETY: `buf` is null or holds `*count` handles.
            unsafe { (self.fns.driver_get)(count, buf) }
        })?;
        Ok(raw
            .into_iter()
            .map(|h| DriverHandle::from_raw(h as usize))
            .collect())
    }

    fn devices(&self, driver: DriverHandle) -> ZeResult<Vec<DeviceHandle>> {
        let raw = enumerate("zeDeviceGet", ptr::null_mut(), |count, buf| {
            // SAFETY: as above.
            unsafe { (self.fns.device_get)(driver_ptr(driver), count, buf) }
        })?;
        Ok(raw
            .into_iter()
            .map(|h| DeviceHandle::from_raw(h as usize))
            .collect())
    }

    fn subdevices(&self, device: DeviceHandle) -> ZeResult<Vec<DeviceHandle>> {
        let raw = enumerate("zeDeviceGetSubDevices", ptr::null_mut(), |count, buf| {
            // SAFETY: as above.
            unsafe { (self.fns.device_get_sub_devices)(device_ptr(device), count, buf) }
        })?;
        Ok(raw
            .into_iter()
            .map(|h| DeviceHandle::from_raw(h as usize))
            .collect())
    }

    fn device_properties(&self, device: DeviceHandle) -> ZeResult<DeviceProperties> {
        let mut props = ze_device_properties_t::default();
        // SAFETY: `props` is a properly typed output record.
        check("zeDeviceGetProperties", unsafe {
            (self.fns.device_get_properties)(device_ptr(device), &mut props)
        })?;
        Ok(convert_device_properties(&props))
    }

    fn command_queue_groups(&self, device: DeviceHandle) -> ZeResult<Vec<QueueGroupProperties>> {
        let raw = enumerate(
            "zeDeviceGetCommandQueueGroupProperties",
            ze_command_queue_group_properties_t::default(),
            |count, buf| {
                // SAFETY: `buf` is null or holds `*count` initialised records.
                unsafe { (self.fns.device_get_cq_group_properties)(device_ptr(device), count, buf) }
            },
        )?;
        Ok(raw
            .iter()
            .map(|p| QueueGroupProperties {
                flags: p.flags,
                max_memory_fill_pattern_size: p.max_memory_fill_pattern_size,
                num_queues: p.num_queues,
            })
            .collect())
    }

    fn memory_properties(&self, device: DeviceHandle) -> ZeResult<Vec<DeviceMemoryProperties>> {
        let raw = enumerate(
            "zeDeviceGetMemoryProperties",
            ze_device_memory_properties_t::default(),
            |count, buf| {
                // SAFETY: as above.
                unsafe { (self.fns.device_get_memory_properties)(device_ptr(device), count, buf) }
            },
        )?;
        Ok(raw
            .iter()
            .map(|p| DeviceMemoryProperties {
                flags: p.flags,
                max_clock_rate: p.max_clock_rate,
                max_bus_width: p.max_bus_width,
                total_size: p.total_size,
                name: fixed_cstr_to_string(&p.name),
            })
            .collect())
    }

    fn sysman_properties(&self, device: DeviceHandle) -> ZeResult<SysmanProperties> {
        let f = self
            .fns
            .sysman_device_get_properties
            .ok_or(ZeError::MissingSymbol("zesDeviceGetProperties"))?;
        let mut props = zes_device_properties_t::default();
        // SAFETY: `props` is a properly typed output record.
        check("zesDeviceGetProperties", unsafe {
            f(device_ptr(device), &mut props)
        })?;
        Ok(SysmanProperties {
            num_subdevices: props.num_subdevices,
            serial_number: fixed_cstr_to_string(&props.serial_number),
            board_number: fixed_cstr_to_string(&props.board_number),
            brand_name: fixed_cstr_to_string(&props.brand_name),
            model_name: fixed_cstr_to_string(&props.model_name),
            vendor_name: fixed_cstr_to_string(&props.vendor_name),
            driver_version: fixed_cstr_to_string(&props.driver_version),
        })
    }

    fn memory_modules(&self, device: DeviceHandle) -> ZeResult<Vec<MemoryHandle>> {
        let f = self
            .fns
            .sysman_enum_memory_modules
            .ok_or(ZeError::MissingSymbol("zesDeviceEnumMemoryModules"))?;
        let raw = enumerate("zesDeviceEnumMemoryModules", ptr::null_mut(), |count, buf| {
            // SAFETY: `buf` is null or holds `*count` handles.
            unsafe { f(device_ptr(device), count, buf) }
        })?;
        Ok(raw
            .into_iter()
            .map(|h| MemoryHandle::from_raw(h as usize))
            .collect())
    }

    fn memory_module_properties(&self, module: MemoryHandle) -> ZeResult<MemoryModuleProperties> {
        let f = self
            .fns
            .sysman_memory_get_properties
            .ok_or(ZeError::MissingSymbol("zesMemoryGetProperties"))?;
        let mut props = zes_mem_properties_t::default();
        // SAFETY: `props` is a properly typed output record.
        check("zesMemoryGetProperties", unsafe {
            f(memory_ptr(module), &mut props)
        })?;
        Ok(MemoryModuleProperties {
            mem_type: props.type_,
            on_subdevice: props.on_subdevice != 0,
            subdevice_id: props.subdevice_id,
            location: props.location,
            physical_size: props.physical_size,
            bus_width: props.bus_width,
            num_channels: props.num_channels,
        })
    }

    fn memory_module_state(&self, module: MemoryHandle) -> ZeResult<MemoryModuleState> {
        let f = self
            .fns
            .sysman_memory_get_state
            .ok_or(ZeError::MissingSymbol("zesMemoryGetState"))?;
        let mut props = zes_mem_state_t::default();
        // SAFETY: `props` is a properly typed output record.
        check("zesMemoryGetState", unsafe {
            f(memory_ptr(module), &mut props)
        })?;
        Ok(MemoryModuleState {
            health: props.health,
            free: props.free,
            size: props.size,
        })
    }

    fn pci_properties(&self, device: DeviceHandle) -> ZeResult<PciProperties> {
        let f = self
            .fns
            .sysman_pci_get_properties
            .ok_or(ZeError::MissingSymbol("zesDevicePciGetProperties"))?;
        let mut props = zes_pci_properties_t::default();
        // SAFETY: `props` is a properly typed output record.
        check("zesDevicePciGetProperties", unsafe {
            f(device_ptr(device), &mut props)
        })?;
        Ok(PciProperties {
            address: PciAddress {
                domain: props.address.domain,
                bus: props.address.bus,
                device: props.address.device,
                function: props.address.function,
            },
            generation: props.max_speed.generation,
            width: props.max_speed.width,
            max_bandwidth: props.max_speed.max_bandwidth,
        })
    }
}
