//! Level Zero device discovery: builds one OS-device node per device and subdevice,
//! fills it with core API and Sysman attributes, and attaches it to the host topology.

pub mod attach;
pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod memory;
pub mod node;
pub mod properties;
pub mod queues;

#[cfg(test)]
pub(crate) mod fake;

pub use attach::{AttachedDevice, HostTopology};
pub use builder::{Discovery, DiscoveryReport};
pub use config::{DiscoveryConfig, MemorySourcePreference, SysmanEnablement};
pub use diagnostics::{Diagnostics, Warning, WarningKind};
pub use memory::{MemorySource, MemorySourceSelection};

use crate::ze::api::LevelZero;

/// Runs a single discovery pass with a fresh memory source selection.
pub fn discover<Z, T>(api: &Z, topology: &mut T, config: &DiscoveryConfig) -> DiscoveryReport
where
    Z: LevelZero + ?Sized,
    T: HostTopology + ?Sized,
{
    let mut selection = MemorySourceSelection::new(config.memory_source);
    Discovery::new(api, config, &mut selection).run(topology)
}

/// Like [`discover`], but first sets `ZES_ENABLE_SYSMAN=1` if it is unset and
/// `config` carries no Sysman classification.
///
/// # Safety
/// Mutates the process environment. No other thread may read or write the
/// environment during the call.
pub unsafe fn discover_reasserting_sysman<Z, T>(
    api: &Z,
    topology: &mut T,
    config: &DiscoveryConfig,
) -> DiscoveryReport
where
    Z: LevelZero + ?Sized,
    T: HostTopology + ?Sized,
{
    let sysman = config
        .sysman
        // SAFETY: forwarded from the caller.
        .unwrap_or_else(|| unsafe { SysmanEnablement::ensure() });
    discover(api, topology, &config.clone().with_sysman(sysman))
}
