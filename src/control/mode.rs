// Enable/disable state of one power stage

/// Operating mode of a stage, sampled once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StageMode {
    #[default]
    Disabled,
    Enabled,
}

impl StageMode {
    pub const fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Edge seen by [`ModeTracker::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    None,
    Enabled,
    Disabled,
}

/// Current mode plus edge detection
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeTracker {
    mode: StageMode,
}

impl ModeTracker {
    pub const fn new() -> Self {
        Self {
            mode: StageMode::Disabled,
        }
    }

    /// Latch this tick's command and report the edge, if any
    pub fn apply(&mut self, command: StageMode) -> Transition {
        let transition = match (self.mode, command) {
            (StageMode::Disabled, StageMode::Enabled) => Transition::Enabled,
            (StageMode::Enabled, StageMode::Disabled) => Transition::Disabled,
            _ => Transition::None,
        };
        self.mode = command;
        transition
    }

    pub fn mode(&self) -> StageMode {
        self.mode
    }
}
