//! Analog monitor output
//!
//! The background loop turns raw ADC counts into [`MonitorFrame`]s and queues
//! them; a low-priority task drains the queue into the quad I2C DAC. Channel 1
//! alternates between 0 V and 3 V so a scope can trigger on frame A.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use libm::floorf;

use crate::config::params::dac;
use crate::config::Topology;
use crate::sampler::{AdcChannel, RawSamples};

/// Queue between the background loop and the DAC task
pub type MonitorQueue = Channel<CriticalSectionRawMutex, MonitorFrame, { dac::QUEUE_DEPTH }>;

/// Values for the four DAC channels [V]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorFrame {
    pub volts: [f32; 4],
}

/// Three bytes that update one DAC channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DacWrite {
    pub bytes: [u8; 3],
}

impl MonitorFrame {
    /// Marker on channel 1, three mirrored inputs on channels 2..4
    pub fn mirror(marker: f32, raw: &RawSamples, inputs: [AdcChannel; 3]) -> Self {
        let [a, b, c] = inputs.map(|ch| count_to_volts(raw.get(ch)));
        Self {
            volts: [marker, a, b, c],
        }
    }

    /// Byte sequences for DAC1..DAC4, in transmit order
    pub fn encode(&self) -> [DacWrite; 4] {
        let mut writes = [DacWrite { bytes: [0; 3] }; 4];
        for (i, write) in writes.iter_mut().enumerate() {
            let code = dac_code(self.volts[i]);
            write.bytes = [
                dac::CHANNEL_ADDRESSES[i],
                (code >> 4) | dac::CHANNEL_SETTINGS[i],
                (code & 0x0F) << 4,
            ];
        }
        writes
    }
}

/// The two frames of one background pass: A with a 0 V marker, B with 3 V
pub fn monitor_frames(topology: Topology, raw: &RawSamples) -> [MonitorFrame; 2] {
    let [first, second] = topology.monitor_channels();
    [
        MonitorFrame::mirror(0.0, raw, first),
        MonitorFrame::mirror(dac::FULL_SCALE_VOLTS, raw, second),
    ]
}

/// `floor(255 · V / 3)`, saturated to [0, 255]
pub fn dac_code(volts: f32) -> u8 {
    let scaled = floorf(volts * dac::MAX_CODE as f32 / dac::FULL_SCALE_VOLTS);
    if scaled >= dac::MAX_CODE as f32 {
        dac::MAX_CODE
    } else if scaled > 0.0 {
        scaled as u8
    } else {
        // negative and NaN
        0
    }
}

/// Raw ADC count as a DAC voltage, `count · 3 / 4096`
#[inline]
pub fn count_to_volts(count: u16) -> f32 {
    count as f32 * dac::VOLTS_PER_COUNT
}

/// Byte sink for the monitor DAC
pub trait MonitorDac {
    type Error;

    /// One three-byte transaction to the DAC's bus address
    fn write(&mut self, write: &DacWrite) -> Result<(), Self::Error>;
}

/// Push a frame, channel by channel; stops at the first bus error
pub fn write_frame<D: MonitorDac>(dac: &mut D, frame: &MonitorFrame) -> Result<(), D::Error> {
    for write in frame.encode().iter() {
        dac.write(write)?;
    }
    Ok(())
}
