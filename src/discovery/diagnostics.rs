use std::collections::HashSet;

/// Category a discovery warning belongs to; one-shot warnings are deduplicated per kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WarningKind {
    RuntimeInit,
    UnexpectedDeviceType,
    SysmanUnavailable,
    /// Memory module reported on a subdevice that was not enumerated.
    SubdeviceAttribution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

/// Warnings raised during one discovery pass.
#[derive(Debug, Default)]
pub struct Diagnostics {
    hide_errors: bool,
    seen: HashSet<WarningKind>,
    warnings: Vec<Warning>,
}

impl Diagnostics {
    #[must_use]
    pub fn new(hide_errors: bool) -> Self {
        Self {
            hide_errors,
            ..Self::default()
        }
    }

    /// Records a warning on every call.
    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        if !self.hide_errors {
            tracing::warn!("{message}");
        }
        self.seen.insert(kind);
        self.warnings.push(Warning { kind, message });
    }

    /// Records a warning unless one of the same kind was already raised.
    ///
    /// Returns whether the warning was recorded.
    pub fn warn_once(&mut self, kind: WarningKind, message: impl FnOnce() -> String) -> bool {
        if self.seen.contains(&kind) {
            return false;
        }
        self.warn(kind, message());
        true
    }

    #[must_use]
    pub fn has_warned(&self, kind: WarningKind) -> bool {
        self.seen.contains(&kind)
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    #[must_use]
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
