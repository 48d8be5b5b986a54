//! Module lifecycle states.

use std::fmt;

/// `Stopped → Starting → Running → Stopping → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModuleState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl ModuleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleState::Stopped => "stopped",
            ModuleState::Starting => "starting",
            ModuleState::Running => "running",
            ModuleState::Stopping => "stopping",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ModuleState::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, ModuleState::Stopped)
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
