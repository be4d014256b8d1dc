//! Level Zero accelerator discovery for a hardware topology tree.

pub mod discovery;
pub mod error;
pub mod topology;
pub mod utils;
pub mod ze;

pub use discovery::{
    DiscoveryConfig, DiscoveryReport, HostTopology, discover, discover_reasserting_sysman,
};
pub use error::{ZeError, ZeResult};
pub use topology::Topology;
pub use ze::{LevelZero, ZeLoader};

/// Sysman devices are only created if `ZES_ENABLE_SYSMAN` is set before `zeInit()`,
/// so set it as soon as the library is loaded.
#[cfg(feature = "early-sysman")]
#[ctor::ctor]
unsafe fn enable_sysman_early() {
    if std::env::var_os(discovery::config::SYSMAN_ENV).is_none() {
        // SAFETY: runs at load time, before any other thread exists.
        unsafe { std::env::set_var(discovery::config::SYSMAN_ENV, "1") };
    }
}
