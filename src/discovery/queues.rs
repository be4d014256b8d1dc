use crate::discovery::node::DeviceNode;
use crate::ze::api::{DeviceHandle, LevelZero};
use tracing::debug;

/// Adds `LevelZeroCQGroups` and one `LevelZeroCQGroup<k>=<queues>*0x<flags>` per group.
pub fn extract_queue_groups<Z: LevelZero + ?Sized>(
    api: &Z,
    device: DeviceHandle,
    node: &mut DeviceNode,
) {
    let groups = match api.command_queue_groups(device) {
        Ok(groups) => groups,
        Err(err) => {
            debug!("{}: {err}", node.name);
            return;
        }
    };
    if groups.is_empty() {
        return;
    }

    node.add_info("LevelZeroCQGroups", groups.len());
    for (k, group) in groups.iter().enumerate() {
        node.add_info(
            format!("LevelZeroCQGroup{k}"),
            format!("{}*0x{:x}", group.num_queues, group.flags),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::fake::{FakeDevice, FakeLevelZero};
    use crate::ze::api::QueueGroupProperties;
    use similar_asserts::assert_eq;

    fn group(flags: u32, num_queues: u32) -> QueueGroupProperties {
        QueueGroupProperties {
            flags,
            max_memory_fill_pattern_size: 4,
            num_queues,
        }
    }

    #[test]
    fn serializes_each_group() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let dev = api.add_device(
            drv,
            FakeDevice {
                queue_groups: Some(vec![group(0x3, 1), group(0x2, 4)]),
                ..FakeDevice::gpu()
            },
        );

        let mut node = DeviceNode::default();
        extract_queue_groups(&api, dev, &mut node);

        assert_eq!(
            node.infos,
            vec![
                ("LevelZeroCQGroups".to_string(), "2".to_string()),
                ("LevelZeroCQGroup0".to_string(), "1*0x3".to_string()),
                ("LevelZeroCQGroup1".to_string(), "4*0x2".to_string()),
            ]
        );
    }

    #[test]
    fn empty_or_failed_enumeration_adds_nothing() {
        let mut api = FakeLevelZero::new();
        let drv = api.add_driver();
        let empty = api.add_device(
            drv,
            FakeDevice {
                queue_groups: Some(Vec::new()),
                ..FakeDevice::gpu()
            },
        );
        let failing = api.add_device(drv, FakeDevice::gpu());

        let mut node = DeviceNode::default();
        extract_queue_groups(&api, empty, &mut node);
        extract_queue_groups(&api, failing, &mut node);
        assert!(node.infos.is_empty());
    }
}
