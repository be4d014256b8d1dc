//! Descriptive attributes of a device or subdevice, from the core API and Sysman.

use crate::discovery::config::SysmanEnablement;
use crate::discovery::diagnostics::{Diagnostics, WarningKind};
use crate::discovery::node::DeviceNode;
use crate::utils::is_unknown_sentinel;
use crate::ze::api::{DeviceHandle, DeviceType, LevelZero, SysmanProperties};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceRole {
    Root,
    Subdevice,
}

/// Populates `node` with the type, shape and identity of `device`.
///
/// Returns whether the device is integrated. Identity strings come from Sysman and
/// are only queried for root devices.
pub fn extract_properties<Z: LevelZero + ?Sized>(
    api: &Z,
    device: DeviceHandle,
    node: &mut DeviceNode,
    role: DeviceRole,
    sysman: SysmanEnablement,
    diag: &mut Diagnostics,
) -> bool {
    let mut is_subdevice = role == DeviceRole::Subdevice;
    let mut is_integrated = false;

    match api.device_properties(device) {
        Ok(props) => {
            if let DeviceType::Other(raw) = props.device_type {
                diag.warn_once(WarningKind::UnexpectedDeviceType, || {
                    format!("Level Zero: unexpected device type {raw}")
                });
            }
            node.add_info("LevelZeroDeviceType", props.device_type.label());
            node.add_info("LevelZeroNumSlices", props.num_slices);
            node.add_info(
                "LevelZeroNumSubslicesPerSlice",
                props.num_subslices_per_slice,
            );
            node.add_info("LevelZeroNumEUsPerSubslice", props.num_eus_per_subslice);
            node.add_info("LevelZeroNumThreadsPerEU", props.num_threads_per_eu);

            is_subdevice |= props.is_subdevice();
            is_integrated = props.is_integrated();
        }
        Err(err) => debug!("{}: {err}", node.name),
    }

    // Sysman reports the root device's identity on subdevices too.
    if is_subdevice {
        return is_integrated;
    }

    match api.sysman_properties(device) {
        Ok(props) => add_identity(node, &props),
        Err(err) => {
            diag.warn_once(WarningKind::SysmanUnavailable, || match sysman {
                SysmanEnablement::MaybeLate => format!(
                    "Level Zero: zesDeviceGetProperties() failed (ZES_ENABLE_SYSMAN=1 set too late?): {err}"
                ),
                SysmanEnablement::Disabled => format!(
                    "Level Zero: zesDeviceGetProperties() failed (ZES_ENABLE_SYSMAN=0): {err}"
                ),
                SysmanEnablement::Enabled => {
                    format!("Level Zero: zesDeviceGetProperties() failed: {err}")
                }
            });
        }
    }

    is_integrated
}

fn add_identity(node: &mut DeviceNode, props: &SysmanProperties) {
    let fields = [
        ("LevelZeroVendor", &props.vendor_name),
        ("LevelZeroModel", &props.model_name),
        ("LevelZeroBrand", &props.brand_name),
        ("LevelZeroSerialNumber", &props.serial_number),
        ("LevelZeroBoardNumber", &props.board_number),
    ];
    for (key, value) in fields {
        if !is_unknown_sentinel(value) {
            node.add_info(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::fake::{FakeDevice, FakeLevelZero, gpu_properties};
    use similar_asserts::assert_eq;
    use test_log::test;

    fn node() -> DeviceNode {
        DeviceNode::new("ze0")
    }

    fn identity(vendor: &str, model: &str) -> SysmanProperties {
        SysmanProperties {
            vendor_name: vendor.into(),
            model_name: model.into(),
            brand_name: "UNKNOWN".into(),
            serial_number: "SN-1".into(),
            board_number: "unknown".into(),
            ..SysmanProperties::default()
        }
    }

    #[test]
    fn shape_counters_are_emitted_even_when_zero() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let mut props = gpu_properties(0);
        props.num_slices = 0;
        props.num_threads_per_eu = 0;
        let dev = api.add_device(
            drv,
            FakeDevice {
                props: Some(props),
                ..FakeDevice::default()
            },
        );

        let mut node = node();
        let mut diag = Diagnostics::new(true);
        extract_properties(&api, dev, &mut node, DeviceRole::Root, SysmanEnablement::Enabled, &mut diag);

        assert_eq!(node.info("LevelZeroDeviceType"), Some("GPU"));
        assert_eq!(node.info("LevelZeroNumSlices"), Some("0"));
        assert_eq!(node.info("LevelZeroNumThreadsPerEU"), Some("0"));
        assert_eq!(node.info("LevelZeroNumSubslicesPerSlice"), Some("4"));
    }

    #[test]
    fn unknown_identity_strings_are_omitted() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let dev = api.add_device(
            drv,
            FakeDevice {
                sysman: Some(identity("Acme", "Unknown")),
                ..FakeDevice::gpu()
            },
        );

        let mut node = node();
        let mut diag = Diagnostics::new(true);
        extract_properties(&api, dev, &mut node, DeviceRole::Root, SysmanEnablement::Enabled, &mut diag);

        assert_eq!(node.info("LevelZeroVendor"), Some("Acme"));
        assert_eq!(node.info("LevelZeroSerialNumber"), Some("SN-1"));
        assert_eq!(node.info("LevelZeroModel"), None);
        assert_eq!(node.info("LevelZeroBrand"), None);
        assert_eq!(node.info("LevelZeroBoardNumber"), None);
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn subdevices_never_query_sysman() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let dev = api.add_device(
            drv,
            FakeDevice {
                sysman: Some(identity("Acme", "X1")),
                ..FakeDevice::gpu()
            },
        );
        // Flagged as a subdevice by the vendor even though the caller asked for a root.
        let flagged = api.add_device(
            drv,
            FakeDevice {
                sysman: Some(identity("Acme", "X1")),
                ..FakeDevice::subdevice(1)
            },
        );

        let mut diag = Diagnostics::new(true);
        let mut sub = node();
        extract_properties(&api, dev, &mut sub, DeviceRole::Subdevice, SysmanEnablement::Enabled, &mut diag);
        let mut root = node();
        extract_properties(&api, flagged, &mut root, DeviceRole::Root, SysmanEnablement::Enabled, &mut diag);

        assert_eq!(api.calls("zesDeviceGetProperties"), 0);
        assert_eq!(sub.info("LevelZeroVendor"), None);
        assert_eq!(root.info("LevelZeroVendor"), None);
        assert_eq!(sub.info("LevelZeroDeviceType"), Some("GPU"));
    }

    #[test]
    fn core_failure_keeps_node_bare() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let dev = api.add_device(drv, FakeDevice::default());

        let mut node = node();
        let mut diag = Diagnostics::new(true);
        let integrated = extract_properties(
            &api,
            dev,
            &mut node,
            DeviceRole::Root,
            SysmanEnablement::Disabled,
            &mut diag,
        );

        assert!(!integrated);
        assert!(node.infos.is_empty());
        assert_eq!(diag.warnings().len(), 1);
        assert!(diag.warnings()[0].message.contains("ZES_ENABLE_SYSMAN=0"));
    }

    #[test]
    fn warnings_are_raised_once_per_pass() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let mut odd = gpu_properties(0);
        odd.device_type = DeviceType::Other(9);
        let devs: Vec<_> = (0..2)
            .map(|_| {
                api.add_device(
                    drv,
                    FakeDevice {
                        props: Some(odd.clone()),
                        ..FakeDevice::default()
                    },
                )
            })
            .collect();

        let mut diag = Diagnostics::new(true);
        for dev in devs {
            let mut node = node();
            extract_properties(&api, dev, &mut node, DeviceRole::Root, SysmanEnablement::MaybeLate, &mut diag);
            assert_eq!(node.info("LevelZeroDeviceType"), Some("Unknown"));
        }

        let kinds: Vec<_> = diag.warnings().iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::UnexpectedDeviceType, WarningKind::SysmanUnavailable]
        );
        assert!(diag.warnings()[1].message.contains("set too late"));
    }

    #[test]
    fn reports_integrated_flag() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let dev = api.add_device(drv, FakeDevice::integrated_gpu());

        let mut node = node();
        let mut diag = Diagnostics::new(true);
        assert!(extract_properties(
            &api,
            dev,
            &mut node,
            DeviceRole::Root,
            SysmanEnablement::Enabled,
            &mut diag
        ));
    }
}
