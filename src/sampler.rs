//! Measurement sampling and ADC calibration
//!
//! The peripheral layer hands over raw 12-bit counts from two ADC banks. Every
//! control input is a bipolar channel centred on mid-scale and scaled by a
//! fixed gain.

use crate::config::params::adc;

/// One analog input, bank A or B, channel 0..7
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdcChannel {
    A0 = 0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    B0,
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
}

impl AdcChannel {
    /// Position in [`RawSamples::counts`]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Raw ADC counts of one conversion sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSamples {
    /// Bank A channels 0..7 followed by bank B channels 0..7
    pub counts: [u16; 16],
}

impl RawSamples {
    /// All channels at mid-scale (zero after calibration)
    pub const fn mid_scale() -> Self {
        Self {
            counts: [adc::MID_SCALE; 16],
        }
    }

    pub fn get(&self, channel: AdcChannel) -> u16 {
        self.counts[channel.index()]
    }

    pub fn set(&mut self, channel: AdcChannel, count: u16) {
        self.counts[channel.index()] = count;
    }
}

impl Default for RawSamples {
    fn default() -> Self {
        Self::mid_scale()
    }
}

/// Calibration of a single bipolar input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCalibration {
    pub channel: AdcChannel,
    /// Engineering units per count
    pub gain: f32,
    /// Count that maps to zero
    pub offset: u16,
}

impl ChannelCalibration {
    pub const fn new(channel: AdcChannel, gain: f32) -> Self {
        Self {
            channel,
            gain,
            offset: adc::MID_SCALE,
        }
    }

    /// Convert the channel's raw count to engineering units
    pub fn apply(&self, raw: &RawSamples) -> f32 {
        self.gain * (raw.get(self.channel) as f32 - self.offset as f32)
    }

    /// Raw count that reads back as `value` (used by simulations)
    pub fn to_count(&self, value: f32) -> u16 {
        let count = libm::roundf(value / self.gain + self.offset as f32);
        count.clamp(0.0, (adc::FULL_SCALE - 1) as f32) as u16
    }
}

/// Channel map and gains for every control input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcCalibration {
    pub ia: ChannelCalibration,
    pub ib: ChannelCalibration,
    pub ic: ChannelCalibration,
    pub vdc: ChannelCalibration,
    pub va: ChannelCalibration,
    pub vb: ChannelCalibration,
    pub vc: ChannelCalibration,
    pub via: ChannelCalibration,
    pub vib: ChannelCalibration,
    pub vic: ChannelCalibration,
}

impl AdcCalibration {
    /// Bench wiring: grid side on bank B, inverter output on bank A
    pub const fn default() -> Self {
        Self {
            ia: ChannelCalibration::new(AdcChannel::B2, adc::CURRENT_GAIN),
            ib: ChannelCalibration::new(AdcChannel::B3, adc::CURRENT_GAIN),
            ic: ChannelCalibration::new(AdcChannel::B4, adc::CURRENT_GAIN),
            vdc: ChannelCalibration::new(AdcChannel::B5, adc::BUS_VOLTAGE_GAIN),
            va: ChannelCalibration::new(AdcChannel::B0, adc::PHASE_VOLTAGE_GAIN),
            vb: ChannelCalibration::new(AdcChannel::B1, adc::PHASE_VOLTAGE_GAIN),
            vc: ChannelCalibration::new(AdcChannel::B6, adc::PHASE_VOLTAGE_GAIN),
            via: ChannelCalibration::new(AdcChannel::A0, adc::PHASE_VOLTAGE_GAIN),
            vib: ChannelCalibration::new(AdcChannel::A1, adc::PHASE_VOLTAGE_GAIN),
            vic: ChannelCalibration::new(AdcChannel::A6, adc::PHASE_VOLTAGE_GAIN),
        }
    }

    /// Produce the calibrated measurement set for this tick
    pub fn calibrate(&self, raw: &RawSamples) -> SampleSet {
        SampleSet {
            ia: self.ia.apply(raw),
            ib: self.ib.apply(raw),
            ic: self.ic.apply(raw),
            va: self.va.apply(raw),
            vb: self.vb.apply(raw),
            vc: self.vc.apply(raw),
            via: self.via.apply(raw),
            vib: self.vib.apply(raw),
            vic: self.vic.apply(raw),
            vdc: self.vdc.apply(raw),
        }
    }

    /// Inverse of [`calibrate`](Self::calibrate), quantised to whole counts
    pub fn to_raw(&self, samples: &SampleSet) -> RawSamples {
        let mut raw = RawSamples::mid_scale();
        let pairs = [
            (self.ia, samples.ia),
            (self.ib, samples.ib),
            (self.ic, samples.ic),
            (self.vdc, samples.vdc),
            (self.va, samples.va),
            (self.vb, samples.vb),
            (self.vc, samples.vc),
            (self.via, samples.via),
            (self.vib, samples.vib),
            (self.vic, samples.vic),
        ];
        for (cal, value) in pairs {
            raw.set(cal.channel, cal.to_count(value));
        }
        raw
    }
}

/// Calibrated measurements of one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleSet {
    /// Rectifier input currents [A]
    pub ia: f32,
    pub ib: f32,
    pub ic: f32,
    /// Grid phase voltages [V]
    pub va: f32,
    pub vb: f32,
    pub vc: f32,
    /// Inverter output voltages [V]
    pub via: f32,
    pub vib: f32,
    pub vic: f32,
    /// DC bus voltage [V]
    pub vdc: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_mid_scale_reads_zero() {
        let samples = AdcCalibration::default().calibrate(&RawSamples::mid_scale());
        assert_eq!(samples, SampleSet::default());
    }

    #[test]
    fn test_channel_gains() {
        let mut raw = RawSamples::mid_scale();
        raw.set(AdcChannel::B5, 2048 + 1000);
        raw.set(AdcChannel::B2, 2048 - 100);
        raw.set(AdcChannel::A6, 2048 + 10);

        let samples = AdcCalibration::default().calibrate(&raw);
        assert!(approx_eq(samples.vdc, 268.7));
        assert!(approx_eq(samples.ia, -1.723));
        assert!(approx_eq(samples.vic, 1.705));
        assert_eq!(samples.ib, 0.0);
    }

    #[test]
    fn test_to_raw_quantises_within_one_count() {
        let cal = AdcCalibration::default();
        let samples = SampleSet {
            va: 120.0,
            vb: -60.0,
            vc: -60.0,
            vdc: 300.0,
            ia: 2.5,
            ..SampleSet::default()
        };
        let back = cal.calibrate(&cal.to_raw(&samples));
        assert!((back.va - samples.va).abs() <= adc::PHASE_VOLTAGE_GAIN);
        assert!((back.vdc - samples.vdc).abs() <= adc::BUS_VOLTAGE_GAIN);
        assert!((back.ia - samples.ia).abs() <= adc::CURRENT_GAIN);
    }
}
