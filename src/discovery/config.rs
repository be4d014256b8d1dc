use crate::utils::parse_leading_int;
use std::env;

/// Memory source override: `-1` auto, `0` Sysman, `1` core API, `2` core API including DDR.
pub const COREAPI_MEMORY_ENV: &str = "ZE_TOPO_COREAPI_MEMORY";
/// Any non-zero value silences diagnostics on the warning stream.
pub const HIDE_ERRORS_ENV: &str = "ZE_TOPO_HIDE_ERRORS";
/// Read by the Level Zero loader at `zeInit()` time to create Sysman devices.
pub const SYSMAN_ENV: &str = "ZES_ENABLE_SYSMAN";

pub const DEFAULT_NAME_PREFIX: &str = "ze";

/// Which API memory sizes should be read from.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum MemorySourcePreference {
    /// Try Sysman on the first device, fall back to the core API if it fails.
    #[default]
    Auto,
    Sysman,
    Core,
    /// Core API, also reporting DDR on integrated devices.
    CoreWithDdr,
}

impl MemorySourcePreference {
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        match parse_leading_int(value) {
            -1 => Self::Auto,
            1 => Self::Core,
            n if n >= 2 => Self::CoreWithDdr,
            _ => Self::Sysman,
        }
    }
}

/// State of `ZES_ENABLE_SYSMAN` when the pass started.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SysmanEnablement {
    /// Set to a non-zero value before the loader was initialized.
    Enabled,
    /// Unset when the pass started; a re-assert may come after the loader was initialized.
    MaybeLate,
    /// Explicitly set to zero.
    Disabled,
}

impl SysmanEnablement {
    #[must_use]
    pub fn classify(value: Option<&str>) -> Self {
        match value {
            None => Self::MaybeLate,
            Some(v) if parse_leading_int(v) == 0 => Self::Disabled,
            Some(_) => Self::Enabled,
        }
    }

    /// Classifies the current environment without modifying it.
    #[must_use]
    pub fn current() -> Self {
        Self::classify(env::var(SYSMAN_ENV).ok().as_deref())
    }

    /// Classifies the current environment and sets `ZES_ENABLE_SYSMAN=1` if it is unset.
    ///
    /// # Safety
    /// Mutates the process environment. No other thread may read or write the
    /// environment while this runs.
    pub unsafe fn ensure() -> Self {
        let enablement = Self::current();
        if enablement == Self::MaybeLate {
            // SAFETY: the caller guarantees exclusive access to the environment.
            unsafe { env::set_var(SYSMAN_ENV, "1") };
        }
        enablement
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub memory_source: MemorySourcePreference,
    pub hide_errors: bool,
    pub name_prefix: String,
    /// Pre-classified Sysman state; `None` classifies the current environment.
    pub sysman: Option<SysmanEnablement>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            memory_source: MemorySourcePreference::Auto,
            hide_errors: false,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            sysman: None,
        }
    }
}

impl DiscoveryConfig {
    /// Reads `ZE_TOPO_COREAPI_MEMORY` and `ZE_TOPO_HIDE_ERRORS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = env::var(COREAPI_MEMORY_ENV) {
            config.memory_source = MemorySourcePreference::from_env_value(&v);
        }
        if let Ok(v) = env::var(HIDE_ERRORS_ENV) {
            config.hide_errors = parse_leading_int(&v) != 0;
        }
        config
    }

    #[must_use]
    pub const fn with_memory_source(mut self, memory_source: MemorySourcePreference) -> Self {
        self.memory_source = memory_source;
        self
    }

    #[must_use]
    pub const fn with_hide_errors(mut self, hide_errors: bool) -> Self {
        self.hide_errors = hide_errors;
        self
    }

    #[must_use]
    pub const fn with_sysman(mut self, sysman: SysmanEnablement) -> Self {
        self.sysman = Some(sysman);
        self
    }

    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }
}
