//! Scripted in-memory [`LevelZero`] provider for discovery tests.

use crate::error::{ZeError, ZeResult};
use crate::ze::api::{
    DeviceHandle, DeviceMemoryProperties, DeviceProperties, DeviceType, DriverHandle, LevelZero,
    MemoryHandle, MemoryModuleProperties, MemoryModuleState, PciAddress, PciProperties,
    QueueGroupProperties, SysmanProperties,
};
use crate::ze::ffi::{
    ZE_DEVICE_PROPERTY_FLAG_INTEGRATED, ZE_DEVICE_PROPERTY_FLAG_SUBDEVICE, ZeResultCode,
};
use std::cell::RefCell;
use std::collections::HashMap;

fn fail<T>(call: &'static str, code: ZeResultCode) -> ZeResult<T> {
    Err(ZeError::Call { call, code })
}

/// Scripted answers for one device; `None` makes the matching query fail.
#[derive(Debug, Clone, Default)]
pub struct FakeDevice {
    pub props: Option<DeviceProperties>,
    pub sysman: Option<SysmanProperties>,
    pub queue_groups: Option<Vec<QueueGroupProperties>>,
    pub core_memory: Option<Vec<DeviceMemoryProperties>>,
    pub modules: Option<Vec<MemoryHandle>>,
    pub pci: Option<PciProperties>,
    pub subdevices: Option<Vec<DeviceHandle>>,
}

impl FakeDevice {
    pub fn gpu() -> Self {
        Self {
            props: Some(gpu_properties(0)),
            ..Self::default()
        }
    }

    pub fn integrated_gpu() -> Self {
        Self {
            props: Some(gpu_properties(ZE_DEVICE_PROPERTY_FLAG_INTEGRATED)),
            ..Self::default()
        }
    }

    pub fn subdevice(id: u32) -> Self {
        let mut props = gpu_properties(ZE_DEVICE_PROPERTY_FLAG_SUBDEVICE);
        props.subdevice_id = id;
        Self {
            props: Some(props),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeModule {
    pub props: Option<MemoryModuleProperties>,
    pub state: Option<MemoryModuleState>,
}

pub fn gpu_properties(flags: u32) -> DeviceProperties {
    DeviceProperties {
        device_type: DeviceType::Gpu,
        vendor_id: 0x8086,
        device_id: 0x0bd5,
        flags,
        subdevice_id: 0,
        num_threads_per_eu: 8,
        num_eus_per_subslice: 8,
        num_subslices_per_slice: 4,
        num_slices: 1,
        name: "Fake GPU".to_string(),
    }
}

pub fn pci_at(bus: u32, max_bandwidth: i64) -> PciProperties {
    PciProperties {
        address: PciAddress {
            domain: 0,
            bus,
            device: 0,
            function: 0,
        },
        generation: 4,
        width: 16,
        max_bandwidth,
    }
}

#[derive(Debug, Default)]
pub struct FakeLevelZero {
    pub init_fails: bool,
    drivers: Vec<Option<Vec<DeviceHandle>>>,
    devices: Vec<FakeDevice>,
    modules: Vec<FakeModule>,
    calls: RefCell<HashMap<&'static str, usize>>,
}

impl FakeLevelZero {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_driver(&mut self) -> usize {
        self.drivers.push(Some(Vec::new()));
        self.drivers.len() - 1
    }

    /// A driver whose device enumeration fails.
    pub fn add_broken_driver(&mut self) -> usize {
        self.drivers.push(None);
        self.drivers.len() - 1
    }

    fn push_device(&mut self, device: FakeDevice) -> DeviceHandle {
        self.devices.push(device);
        DeviceHandle::from_raw(self.devices.len())
    }

    pub fn add_device(&mut self, driver: usize, device: FakeDevice) -> DeviceHandle {
        let handle = self.push_device(device);
        if let Some(devices) = &mut self.drivers[driver] {
            devices.push(handle);
        }
        handle
    }

    pub fn add_subdevice(&mut self, parent: DeviceHandle, device: FakeDevice) -> DeviceHandle {
        let handle = self.push_device(device);
        self.device_mut(parent)
            .subdevices
            .get_or_insert_with(Vec::new)
            .push(handle);
        handle
    }

    pub fn add_module(&mut self, device: DeviceHandle, module: FakeModule) -> MemoryHandle {
        self.modules.push(module);
        let handle = MemoryHandle::from_raw(self.modules.len());
        self.device_mut(device)
            .modules
            .get_or_insert_with(Vec::new)
            .push(handle);
        handle
    }

    pub fn device_mut(&mut self, handle: DeviceHandle) -> &mut FakeDevice {
        &mut self.devices[handle.as_raw() - 1]
    }

    fn device(&self, handle: DeviceHandle) -> &FakeDevice {
        &self.devices[handle.as_raw() - 1]
    }

    fn module(&self, handle: MemoryHandle) -> &FakeModule {
        &self.modules[handle.as_raw() - 1]
    }

    fn record(&self, call: &'static str) {
        *self.calls.borrow_mut().entry(call).or_default() += 1;
    }

    /// Number of times `call` was issued.
    pub fn calls(&self, call: &str) -> usize {
        self.calls.borrow().get(call).copied().unwrap_or(0)
    }
}

impl LevelZero for FakeLevelZero {
    fn init(&self) -> ZeResult<()> {
        self.record("zeInit");
        if self.init_fails {
            return fail("zeInit", ZeResultCode::ERROR_UNINITIALIZED);
        }
        Ok(())
    }

    fn drivers(&self) -> ZeResult<Vec<DriverHandle>> {
        self.record("zeDriverGet");
        Ok((0..self.drivers.len()).map(DriverHandle::from_raw).collect())
    }

    fn devices(&self, driver: DriverHandle) -> ZeResult<Vec<DeviceHandle>> {
        self.record("zeDeviceGet");
        match &self.drivers[driver.as_raw()] {
            Some(devices) => Ok(devices.clone()),
            None => fail("zeDeviceGet", ZeResultCode::ERROR_DEVICE_LOST),
        }
    }

    fn subdevices(&self, device: DeviceHandle) -> ZeResult<Vec<DeviceHandle>> {
        self.record("zeDeviceGetSubDevices");
        match &self.device(device).subdevices {
            Some(subs) => Ok(subs.clone()),
            None => fail("zeDeviceGetSubDevices", ZeResultCode::ERROR_INVALID_ARGUMENT),
        }
    }

    fn device_properties(&self, device: DeviceHandle) -> ZeResult<DeviceProperties> {
        self.record("zeDeviceGetProperties");
        self.device(device).props.clone().map_or_else(
            || fail("zeDeviceGetProperties", ZeResultCode::ERROR_UNKNOWN),
            Ok,
        )
    }

    fn command_queue_groups(&self, device: DeviceHandle) -> ZeResult<Vec<QueueGroupProperties>> {
        self.record("zeDeviceGetCommandQueueGroupProperties");
        self.device(device).queue_groups.clone().map_or_else(
            || {
                fail(
                    "zeDeviceGetCommandQueueGroupProperties",
                    ZeResultCode::ERROR_UNKNOWN,
                )
            },
            Ok,
        )
    }

    fn memory_properties(&self, device: DeviceHandle) -> ZeResult<Vec<DeviceMemoryProperties>> {
        self.record("zeDeviceGetMemoryProperties");
        self.device(device).core_memory.clone().map_or_else(
            || fail("zeDeviceGetMemoryProperties", ZeResultCode::ERROR_UNKNOWN),
            Ok,
        )
    }

    fn sysman_properties(&self, device: DeviceHandle) -> ZeResult<SysmanProperties> {
        self.record("zesDeviceGetProperties");
        self.device(device).sysman.clone().map_or_else(
            || fail("zesDeviceGetProperties", ZeResultCode::ERROR_UNINITIALIZED),
            Ok,
        )
    }

    fn memory_modules(&self, device: DeviceHandle) -> ZeResult<Vec<MemoryHandle>> {
        self.record("zesDeviceEnumMemoryModules");
        self.device(device).modules.clone().map_or_else(
            || {
                fail(
                    "zesDeviceEnumMemoryModules",
                    ZeResultCode::ERROR_UNSUPPORTED_FEATURE,
                )
            },
            Ok,
        )
    }

    fn memory_module_properties(&self, module: MemoryHandle) -> ZeResult<MemoryModuleProperties> {
        self.record("zesMemoryGetProperties");
        self.module(module).props.map_or_else(
            || fail("zesMemoryGetProperties", ZeResultCode::ERROR_UNKNOWN),
            Ok,
        )
    }

    fn memory_module_state(&self, module: MemoryHandle) -> ZeResult<MemoryModuleState> {
        self.record("zesMemoryGetState");
        self.module(module).state.map_or_else(
            || fail("zesMemoryGetState", ZeResultCode::ERROR_UNKNOWN),
            Ok,
        )
    }

    fn pci_properties(&self, device: DeviceHandle) -> ZeResult<PciProperties> {
        self.record("zesDevicePciGetProperties");
        self.device(device).pci.map_or_else(
            || fail("zesDevicePciGetProperties", ZeResultCode::ERROR_UNKNOWN),
            Ok,
        )
    }
}
