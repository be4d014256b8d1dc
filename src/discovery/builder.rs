use crate::discovery::attach::{AttachedDevice, HostTopology, attach_device};
use crate::discovery::config::{DiscoveryConfig, SysmanEnablement};
use crate::discovery::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::discovery::memory::{MemoryScope, MemorySourceSelection, collect_memory};
use crate::discovery::node::{DeviceArena, NodeId, Subdevice};
use crate::discovery::properties::{DeviceRole, extract_properties};
use crate::discovery::queues::extract_queue_groups;
use crate::topology::tree::TypeFilter;
use crate::ze::api::{DeviceHandle, LevelZero};
use tracing::debug;

pub const BACKEND: &str = "LevelZero";

/// Outcome of a discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub devices: Vec<AttachedDevice>,
    pub warnings: Vec<Warning>,
}

/// One discovery pass over every Level Zero driver and device.
pub struct Discovery<'a, Z: LevelZero + ?Sized> {
    api: &'a Z,
    config: &'a DiscoveryConfig,
    selection: &'a mut MemorySourceSelection,
    diagnostics: Diagnostics,
}

impl<'a, Z: LevelZero + ?Sized> Discovery<'a, Z> {
    pub fn new(
        api: &'a Z,
        config: &'a DiscoveryConfig,
        selection: &'a mut MemorySourceSelection,
    ) -> Self {
        Self {
            api,
            config,
            selection,
            diagnostics: Diagnostics::new(config.hide_errors),
        }
    }

    /// Adds every device and subdevice to `topology`.
    ///
    /// Vendor failures never abort the pass; they degrade to missing attributes,
    /// skipped devices, or an empty report.
    pub fn run<T: HostTopology + ?Sized>(mut self, topology: &mut T) -> DiscoveryReport {
        if topology.os_device_filter() == TypeFilter::KeepNone {
            return DiscoveryReport::default();
        }

        let sysman = self.config.sysman.unwrap_or_else(SysmanEnablement::current);

        if let Err(err) = self.api.init() {
            self.diagnostics.warn(
                WarningKind::RuntimeInit,
                format!("Failed to initialize Level Zero in zeInit(): {err}"),
            );
            return self.finish(Vec::new());
        }

        let drivers = match self.api.drivers() {
            Ok(drivers) => drivers,
            Err(err) => {
                debug!("{err}");
                return self.finish(Vec::new());
            }
        };

        let mut devices = Vec::new();
        for (i, driver) in drivers.into_iter().enumerate() {
            let handles = match self.api.devices(driver) {
                Ok(handles) => handles,
                Err(err) => {
                    debug!("driver #{i}: {err}");
                    continue;
                }
            };

            for (j, device) in handles.into_iter().enumerate() {
                let index = devices.len();
                let (arena, root) = self.build_device(device, index, i, j, sysman);
                devices.push(attach_device(self.api, topology, device, arena, root));
            }
        }

        self.finish(devices)
    }

    fn finish(self, devices: Vec<AttachedDevice>) -> DiscoveryReport {
        DiscoveryReport {
            devices,
            warnings: self.diagnostics.into_warnings(),
        }
    }

    fn build_device(
        &mut self,
        device: DeviceHandle,
        index: usize,
        driver_index: usize,
        device_index: usize,
        sysman: SysmanEnablement,
    ) -> (DeviceArena, NodeId) {
        let mut arena = DeviceArena::new();
        let name = format!("{}{index}", self.config.name_prefix);
        let root = arena.alloc(name.clone());
        {
            let node = arena.get_mut(root);
            node.subtype = Some(BACKEND.to_string());
            node.add_info("Backend", BACKEND);
            node.add_info("LevelZeroDriverIndex", driver_index);
            node.add_info("LevelZeroDriverDeviceIndex", device_index);
        }

        let is_integrated = extract_properties(
            self.api,
            device,
            arena.get_mut(root),
            DeviceRole::Root,
            sysman,
            &mut self.diagnostics,
        );
        extract_queue_groups(self.api, device, arena.get_mut(root));

        // Devices without subdevices report ERROR_INVALID_ARGUMENT.
        let handles = self.api.subdevices(device).unwrap_or_else(|err| {
            debug!("{name}: no subdevices ({err})");
            Vec::new()
        });

        let mut subdevices = Vec::with_capacity(handles.len());
        if !handles.is_empty() {
            arena
                .get_mut(root)
                .add_info("LevelZeroSubdevices", handles.len());

            for (k, handle) in handles.into_iter().enumerate() {
                let node = arena.alloc(format!("{name}.{k}"));
                {
                    let sub = arena.get_mut(node);
                    sub.subtype = Some(BACKEND.to_string());
                    sub.add_info("Backend", BACKEND);
                    sub.add_info("LevelZeroSubdeviceID", k);
                }
                extract_properties(
                    self.api,
                    handle,
                    arena.get_mut(node),
                    DeviceRole::Subdevice,
                    sysman,
                    &mut self.diagnostics,
                );
                extract_queue_groups(self.api, handle, arena.get_mut(node));
                arena.add_child(root, node);
                subdevices.push(Subdevice { handle, node });
            }
        }

        let scope = MemoryScope {
            device,
            root,
            subdevices: &subdevices,
            is_integrated,
        };
        collect_memory(
            self.api,
            self.selection,
            &scope,
            &mut arena,
            &mut self.diagnostics,
        );

        (arena, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::config::MemorySourcePreference;
    use crate::discovery::fake::{FakeDevice, FakeLevelZero, FakeModule, pci_at};
    use crate::discovery::memory::MemorySource;
    use crate::topology::tree::{ObjId, ObjType, Object, PciAttributes, Topology};
    use crate::ze::api::{DeviceMemoryProperties, MemoryModuleProperties, SysmanProperties};
    use crate::ze::ffi::{ZES_MEM_TYPE_DDR, ZES_MEM_TYPE_HBM};
    use similar_asserts::assert_eq;
    use test_log::test;

    fn config(memory_source: MemorySourcePreference) -> DiscoveryConfig {
        DiscoveryConfig::default()
            .with_memory_source(memory_source)
            .with_hide_errors(true)
            .with_sysman(SysmanEnablement::Enabled)
    }

    fn run(api: &FakeLevelZero, config: &DiscoveryConfig, topo: &mut Topology) -> DiscoveryReport {
        let mut selection = MemorySourceSelection::new(config.memory_source);
        Discovery::new(api, config, &mut selection).run(topo)
    }

    fn info<'t>(topo: &'t Topology, id: ObjId, key: &str) -> Option<&'t str> {
        topo.get(id).info(key)
    }

    #[test]
    fn acme_device_with_hbm_through_sysman() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let dev = api.add_device(
            drv,
            FakeDevice {
                sysman: Some(SysmanProperties {
                    vendor_name: "Acme".into(),
                    model_name: "Unknown".into(),
                    ..SysmanProperties::default()
                }),
                ..FakeDevice::gpu()
            },
        );
        api.add_module(
            dev,
            FakeModule {
                props: Some(MemoryModuleProperties {
                    mem_type: ZES_MEM_TYPE_HBM,
                    physical_size: 1 << 30,
                    ..MemoryModuleProperties::default()
                }),
                state: None,
            },
        );

        let mut topo = Topology::new();
        let report = run(&api, &config(MemorySourcePreference::Auto), &mut topo);

        assert_eq!(report.devices.len(), 1);
        let id = report.devices[0].object;
        assert_eq!(topo.get(id).name.as_deref(), Some("ze0"));
        assert_eq!(topo.get(id).subtype.as_deref(), Some("LevelZero"));
        assert_eq!(info(&topo, id, "Backend"), Some("LevelZero"));
        assert_eq!(info(&topo, id, "LevelZeroVendor"), Some("Acme"));
        assert_eq!(info(&topo, id, "LevelZeroModel"), None);
        assert_eq!(info(&topo, id, "LevelZeroHBMSize"), Some("1048576"));
        assert_eq!(info(&topo, id, "LevelZeroSubdevices"), None);
        assert!(report.devices[0].subdevices.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn integrated_device_drops_ddr_through_core_api() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let dev = api.add_device(drv, FakeDevice::integrated_gpu());
        for k in 0..2 {
            let sub = api.add_subdevice(dev, FakeDevice::subdevice(k));
            api.device_mut(sub).core_memory = Some(vec![DeviceMemoryProperties {
                name: "DDR".into(),
                total_size: 1 << 20,
                ..DeviceMemoryProperties::default()
            }]);
        }

        let mut topo = Topology::new();
        let report = run(&api, &config(MemorySourcePreference::Core), &mut topo);

        let device = &report.devices[0];
        assert_eq!(info(&topo, device.object, "LevelZeroSubdevices"), Some("2"));
        assert_eq!(device.subdevices.len(), 2);
        for (k, sub) in device.subdevices.iter().enumerate() {
            assert_eq!(topo.get(*sub).name, Some(format!("ze0.{k}")));
            assert_eq!(info(&topo, *sub, "LevelZeroSubdeviceID"), Some(k.to_string().as_str()));
            assert_eq!(info(&topo, *sub, "LevelZeroDDRSize"), None);
            assert_eq!(info(&topo, *sub, "LevelZeroVendor"), None);
        }
        assert_eq!(api.calls("zesDeviceEnumMemoryModules"), 0);
    }

    #[test]
    fn selection_is_sticky_across_devices() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let first = api.add_device(drv, FakeDevice::gpu());
        let second = api.add_device(drv, FakeDevice::gpu());
        api.add_module(
            second,
            FakeModule {
                props: Some(MemoryModuleProperties {
                    mem_type: ZES_MEM_TYPE_DDR,
                    physical_size: 1 << 30,
                    ..MemoryModuleProperties::default()
                }),
                state: None,
            },
        );
        api.device_mut(first).core_memory = Some(Vec::new());

        let config = config(MemorySourcePreference::Auto);
        let mut selection = MemorySourceSelection::new(config.memory_source);
        let mut topo = Topology::new();
        let report = Discovery::new(&api, &config, &mut selection).run(&mut topo);

        assert_eq!(selection.source(), MemorySource::Core);
        assert_eq!(api.calls("zesDeviceEnumMemoryModules"), 1);
        assert_eq!(api.calls("zeDeviceGetMemoryProperties"), 2);
        assert_eq!(info(&topo, report.devices[1].object, "LevelZeroDDRSize"), None);
    }

    #[test]
    fn indices_and_names_follow_enumeration() {
        let mut api = FakeLevelZero::new();
        let first = api.add_driver();
        api.add_broken_driver();
        let third = api.add_driver();
        api.add_device(first, FakeDevice::gpu());
        api.add_device(third, FakeDevice::gpu());
        api.add_device(third, FakeDevice::gpu());

        let mut topo = Topology::new();
        let report = run(&api, &config(MemorySourcePreference::Core), &mut topo);

        let seen: Vec<_> = report
            .devices
            .iter()
            .map(|d| {
                (
                    topo.get(d.object).name.clone().unwrap_or_default(),
                    info(&topo, d.object, "LevelZeroDriverIndex").map(str::to_string),
                    info(&topo, d.object, "LevelZeroDriverDeviceIndex").map(str::to_string),
                )
            })
            .collect();
        assert_eq!(
            seen,
            vec![
                ("ze0".to_string(), Some("0".to_string()), Some("0".to_string())),
                ("ze1".to_string(), Some("2".to_string()), Some("0".to_string())),
                ("ze2".to_string(), Some("2".to_string()), Some("1".to_string())),
            ]
        );
    }

    #[test]
    fn device_lands_below_its_pci_function() {
        let mut topo = Topology::new();
        let root = topo.root();
        let pci = topo.insert_by_parent(
            root,
            Object::new(ObjType::PciDevice).with_pci(PciAttributes {
                address: pci_at(0x3a, 0).address,
                ..PciAttributes::default()
            }),
        );

        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        api.add_device(
            drv,
            FakeDevice {
                pci: Some(pci_at(0x3a, 0)),
                ..FakeDevice::gpu()
            },
        );

        let report = run(&api, &config(MemorySourcePreference::Core), &mut topo);
        assert_eq!(topo.get(report.devices[0].object).parent(), Some(pci));
        assert_eq!(topo.get(pci).pci.unwrap().link_speed, 0.0);
    }

    #[test]
    fn keep_none_filter_skips_everything() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        api.add_device(drv, FakeDevice::gpu());

        let mut topo = Topology::new();
        topo.set_type_filter(ObjType::OsDevice, crate::topology::tree::TypeFilter::KeepNone);
        let report = run(&api, &config(MemorySourcePreference::Auto), &mut topo);

        assert!(report.devices.is_empty());
        assert_eq!(api.calls("zeInit"), 0);
        assert_eq!(topo.len(), 1);
    }

    #[test]
    fn init_failure_is_a_warning_not_an_error() {
        let mut api = FakeLevelZero::new();
        api.init_fails = true;

        let mut topo = Topology::new();
        let report = run(&api, &config(MemorySourcePreference::Auto), &mut topo);

        assert!(report.devices.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::RuntimeInit);
        assert_eq!(api.calls("zeDriverGet"), 0);
    }
}
