// Sinusoidal duty synthesis for one three-phase bridge

use super::transforms::Abc;
use libm::roundf;

/// Per-leg duty cycles in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyCycles {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl DutyCycles {
    /// All legs at 50 %: zero average phase voltage
    pub const NEUTRAL: Self = Self {
        a: 0.5,
        b: 0.5,
        c: 0.5,
    };

    pub const fn as_array(&self) -> [f32; 3] {
        [self.a, self.b, self.c]
    }

    /// Timer compare values for a carrier of `period` counts
    ///
    /// `round(duty · period)`, clamped to `[0, period]`
    pub fn to_compare(&self, period: u16) -> [u16; 3] {
        self.as_array().map(|duty| duty_to_compare(duty, period))
    }
}

impl Default for DutyCycles {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Duty triple plus what the modulator had to do to produce it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulation {
    pub duty: DutyCycles,
    /// Measured bus was below the minimum and the divisor was raised
    pub bus_guard: bool,
    /// At least one leg fell outside [0, 1] and was clamped
    pub saturated: bool,
}

/// Reference voltage to duty converter
#[derive(Debug, Clone, Copy)]
pub struct Modulator {
    /// Smallest bus voltage used as divisor [V]
    min_bus_voltage: f32,
}

impl Modulator {
    pub const fn new(min_bus_voltage: f32) -> Self {
        Self { min_bus_voltage }
    }

    /// `duty = 0.5 · v / (Vdc / 2) + 0.5` per leg, clamped to [0, 1]
    ///
    /// # Arguments
    /// * `v_ref` - Phase voltage references [V]
    /// * `v_dc` - Measured DC bus voltage [V]
    pub fn synthesize(&self, v_ref: Abc, v_dc: f32) -> Modulation {
        let bus_guard = !(v_dc >= self.min_bus_voltage);
        let bus = if bus_guard { self.min_bus_voltage } else { v_dc };
        let half_bus = bus * 0.5;

        let mut saturated = false;
        let mut leg = |v: f32| {
            let raw = 0.5 * (v / half_bus) + 0.5;
            if raw > 1.0 {
                saturated = true;
                1.0
            } else if !(raw >= 0.0) {
                // NaN lands here too
                saturated = true;
                0.0
            } else {
                raw
            }
        };

        let duty = DutyCycles {
            a: leg(v_ref.a),
            b: leg(v_ref.b),
            c: leg(v_ref.c),
        };

        Modulation {
            duty,
            bus_guard,
            saturated,
        }
    }
}

/// Duty [0, 1] → compare count [0, period]
#[inline]
pub fn duty_to_compare(duty: f32, period: u16) -> u16 {
    let max = period as f32;
    roundf(duty * max).clamp(0.0, max) as u16
}
