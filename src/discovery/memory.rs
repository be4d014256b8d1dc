//! Per-device memory sizes, read either from Sysman memory modules or from the
//! core API memory properties.
//!
//! The source is chosen once per pass and then kept for every later device: under
//! [`MemorySourcePreference::Auto`] the first device tries Sysman and falls back to
//! the core API if module enumeration fails.

use crate::discovery::config::MemorySourcePreference;
use crate::discovery::diagnostics::{Diagnostics, WarningKind};
use crate::discovery::node::{DeviceArena, DeviceNode, NodeId, Subdevice};
use crate::error::ZeResult;
use crate::ze::api::{DeviceHandle, LevelZero, MemoryKind};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemorySource {
    Unresolved,
    Core,
    Sysman,
}

/// Memory source preference plus the source it resolved to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemorySourceSelection {
    preference: MemorySourcePreference,
    source: MemorySource,
}

impl MemorySourceSelection {
    #[must_use]
    pub const fn new(preference: MemorySourcePreference) -> Self {
        Self {
            preference,
            source: MemorySource::Unresolved,
        }
    }

    #[must_use]
    pub const fn source(&self) -> MemorySource {
        self.source
    }
}

/// The device whose memory is being described.
#[derive(Debug, Clone, Copy)]
pub struct MemoryScope<'a> {
    pub device: DeviceHandle,
    pub root: NodeId,
    pub subdevices: &'a [Subdevice],
    pub is_integrated: bool,
}

/// Adds `LevelZero<Kind>Size` attributes to the device and its subdevices.
pub fn collect_memory<Z: LevelZero + ?Sized>(
    api: &Z,
    selection: &mut MemorySourceSelection,
    scope: &MemoryScope<'_>,
    arena: &mut DeviceArena,
    diag: &mut Diagnostics,
) {
    if selection.source == MemorySource::Unresolved {
        let resolved = match selection.preference {
            MemorySourcePreference::Auto => {
                match memory_from_sysman(api, scope, arena, diag) {
                    Ok(()) => {
                        debug!("Sysman memory query succeeded, disabling core API memory queries");
                        selection.source = MemorySource::Sysman;
                        return;
                    }
                    Err(err) => {
                        debug!("Sysman memory query failed ({err}), using core API memory queries");
                        MemorySource::Core
                    }
                }
            }
            MemorySourcePreference::Sysman => MemorySource::Sysman,
            MemorySourcePreference::Core | MemorySourcePreference::CoreWithDdr => {
                MemorySource::Core
            }
        };
        selection.source = resolved;
    }

    match selection.source {
        MemorySource::Core => {
            let ignore_ddr = selection.preference != MemorySourcePreference::CoreWithDdr
                && scope.is_integrated;
            memory_from_core(api, scope.device, arena.get_mut(scope.root), ignore_ddr);
            for sub in scope.subdevices {
                memory_from_core(api, sub.handle, arena.get_mut(sub.node), ignore_ddr);
            }
        }
        MemorySource::Sysman => {
            if let Err(err) = memory_from_sysman(api, scope, arena, diag) {
                debug!("{}: {err}", arena.get(scope.root).name);
            }
        }
        MemorySource::Unresolved => {}
    }
}

#[derive(Debug, Default)]
struct Totals {
    hbm_kib: u64,
    ddr_kib: u64,
}

impl Totals {
    fn add(&mut self, kind: MemoryKind, kib: u64) {
        match kind {
            MemoryKind::Hbm => self.hbm_kib = self.hbm_kib.saturating_add(kib),
            MemoryKind::Ddr => self.ddr_kib = self.ddr_kib.saturating_add(kib),
            MemoryKind::Other => {}
        }
    }
}

fn memory_from_sysman<Z: LevelZero + ?Sized>(
    api: &Z,
    scope: &MemoryScope<'_>,
    arena: &mut DeviceArena,
    diag: &mut Diagnostics,
) -> ZeResult<()> {
    let modules = api.memory_modules(scope.device)?;
    let mut totals = Totals::default();

    for (m, module) in modules.iter().enumerate() {
        let mut props = match api.memory_module_properties(*module) {
            Ok(props) => props,
            Err(err) => {
                debug!("memory module #{m}: {err}");
                continue;
            }
        };

        if props.physical_size == 0 {
            // Some drivers only report the size through the live state.
            if let Ok(state) = api.memory_module_state(*module) {
                debug!("memory module #{m}: using state size {}", state.size);
                props.physical_size = state.size;
            }
        }

        let kind = props.kind();
        let kib = props.physical_size >> 10;
        debug!(
            "memory module #{m}: type {} location {} on subdevice {} #{} size {} KiB",
            props.mem_type, props.location, props.on_subdevice, props.subdevice_id, kib
        );

        if props.on_subdevice {
            match scope.subdevices.get(props.subdevice_id as usize) {
                Some(sub) if props.physical_size > 0 => {
                    arena
                        .get_mut(sub.node)
                        .add_info(format!("LevelZero{}Size", kind.label()), kib);
                }
                Some(_) => {}
                None => diag.warn(
                    WarningKind::SubdeviceAttribution,
                    format!(
                        "Level Zero: memory module #{m} on unexpected subdevice #{}",
                        props.subdevice_id
                    ),
                ),
            }
        }

        totals.add(kind, kib);
    }

    let root = arena.get_mut(scope.root);
    if totals.hbm_kib > 0 {
        root.add_info("LevelZeroHBMSize", totals.hbm_kib);
    }
    if totals.ddr_kib > 0 {
        root.add_info("LevelZeroDDRSize", totals.ddr_kib);
    }
    Ok(())
}

fn memory_from_core<Z: LevelZero + ?Sized>(
    api: &Z,
    device: DeviceHandle,
    node: &mut DeviceNode,
    ignore_ddr: bool,
) {
    let memories = match api.memory_properties(device) {
        Ok(memories) => memories,
        Err(err) => {
            debug!("{}: {err}", node.name);
            return;
        }
    };

    for mem in &memories {
        debug!(
            "{}: memory {:?} size {} clock {} bus width {}",
            node.name, mem.name, mem.total_size, mem.max_clock_rate, mem.max_bus_width
        );
        if mem.total_size == 0 {
            continue;
        }
        if ignore_ddr && mem.name == "DDR" {
            continue;
        }
        let name = if mem.name.is_empty() {
            "Memory"
        } else {
            mem.name.as_str()
        };
        node.add_info(format!("LevelZero{name}Size"), mem.total_size >> 10);
    }
}
