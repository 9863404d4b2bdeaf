//! State shared between the control tick and the background loop
//!
//! The tick owns all control state. Only enable commands, fault indications
//! and the latest raw samples cross the boundary, through atomics and a
//! critical-section cell.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::control::StageMode;
use crate::hardware::Stage;
use crate::sampler::RawSamples;

/// Enable flags written by the background loop, read once per tick
pub struct SharedCommands {
    rectifier: AtomicBool,
    inverter: AtomicBool,
}

impl SharedCommands {
    /// Both stages disabled
    pub const fn new() -> Self {
        Self {
            rectifier: AtomicBool::new(false),
            inverter: AtomicBool::new(false),
        }
    }

    fn flag(&self, stage: Stage) -> &AtomicBool {
        match stage {
            Stage::Rectifier => &self.rectifier,
            Stage::Inverter => &self.inverter,
        }
    }

    pub fn set(&self, stage: Stage, enabled: bool) {
        self.flag(stage).store(enabled, Ordering::Release);
    }

    pub fn mode(&self, stage: Stage) -> StageMode {
        StageMode::from_enabled(self.flag(stage).load(Ordering::Acquire))
    }
}

impl Default for SharedCommands {
    fn default() -> Self {
        Self::new()
    }
}

/// Fault and status classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Bus voltage below the modulator's minimum divisor
    BusVoltageGuard,
    /// Duty clamped to 0 or 1
    DutySaturation,
    /// Tick exceeded its cycle budget
    Overrun,
    /// Monitor queue full, frame dropped
    MonitorBackpressure,
}

impl Fault {
    pub const ALL: [Fault; 4] = [
        Fault::BusVoltageGuard,
        Fault::DutySaturation,
        Fault::Overrun,
        Fault::MonitorBackpressure,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of [`Fault`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultFlags(u8);

impl FaultFlags {
    pub const EMPTY: Self = Self(0);

    pub fn insert(&mut self, fault: Fault) {
        self.0 |= fault.bit();
    }

    pub const fn contains(self, fault: Fault) -> bool {
        self.0 & fault.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Fault> {
        Fault::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

/// Event counters, copied out of [`FaultStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultCounters {
    pub bus_guard: u32,
    pub duty_saturation: u32,
    pub overruns: u32,
    pub monitor_drops: u32,
    /// Enabled → Disabled transitions of either stage
    pub mode_resets: u32,
}

/// Latched fault indicator
///
/// Flags stay set until [`clear`](Self::clear); counters keep counting.
pub struct FaultStatus {
    latched: AtomicU8,
    bus_guard: AtomicU32,
    duty_saturation: AtomicU32,
    overruns: AtomicU32,
    monitor_drops: AtomicU32,
    mode_resets: AtomicU32,
}

impl FaultStatus {
    pub const fn new() -> Self {
        Self {
            latched: AtomicU8::new(0),
            bus_guard: AtomicU32::new(0),
            duty_saturation: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
            monitor_drops: AtomicU32::new(0),
            mode_resets: AtomicU32::new(0),
        }
    }

    fn counter(&self, fault: Fault) -> &AtomicU32 {
        match fault {
            Fault::BusVoltageGuard => &self.bus_guard,
            Fault::DutySaturation => &self.duty_saturation,
            Fault::Overrun => &self.overruns,
            Fault::MonitorBackpressure => &self.monitor_drops,
        }
    }

    /// Latch a fault and count it
    ///
    /// Returns `true` if the flag was not latched before.
    pub fn raise(&self, fault: Fault) -> bool {
        self.counter(fault).fetch_add(1, Ordering::Relaxed);
        let previous = self.latched.fetch_or(fault.bit(), Ordering::AcqRel);
        previous & fault.bit() == 0
    }

    pub fn record_mode_reset(&self) {
        self.mode_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_latched(&self, fault: Fault) -> bool {
        self.latched().contains(fault)
    }

    pub fn latched(&self) -> FaultFlags {
        FaultFlags(self.latched.load(Ordering::Acquire))
    }

    /// Release all latched flags
    pub fn clear(&self) {
        self.latched.store(0, Ordering::Release);
    }

    pub fn counters(&self) -> FaultCounters {
        FaultCounters {
            bus_guard: self.bus_guard.load(Ordering::Relaxed),
            duty_saturation: self.duty_saturation.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            monitor_drops: self.monitor_drops.load(Ordering::Relaxed),
            mode_resets: self.mode_resets.load(Ordering::Relaxed),
        }
    }
}

impl Default for FaultStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest raw samples, published by the tick
pub struct SampleMailbox {
    inner: Mutex<CriticalSectionRawMutex, Cell<Option<RawSamples>>>,
}

impl SampleMailbox {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(None)),
        }
    }

    pub fn publish(&self, samples: RawSamples) {
        self.inner.lock(|cell| cell.set(Some(samples)));
    }

    /// Most recent samples, `None` before the first tick
    pub fn latest(&self) -> Option<RawSamples> {
        self.inner.lock(|cell| cell.get())
    }
}

impl Default for SampleMailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the tick and the background loop share
pub struct SharedState {
    pub commands: SharedCommands,
    pub faults: FaultStatus,
    pub samples: SampleMailbox,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            commands: SharedCommands::new(),
            faults: FaultStatus::new(),
            samples: SampleMailbox::new(),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
