//! Converter topology selection
//!
//! The bench racks differ in which CAN mailboxes carry the enable commands and
//! which analog inputs are mirrored on the monitor DAC. The variant is chosen
//! once at start-up.

use crate::sampler::AdcChannel;

/// CAN identifiers carrying the stage enable commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnableCommandIds {
    /// Extended identifier of the rectifier enable message
    pub afe: u32,
    /// Extended identifier of the inverter enable message
    pub inv: u32,
}

/// Converter variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Topology {
    /// Back-to-back converter on rack 1
    BackToBackRack1,
    /// Back-to-back converter on rack 2
    BackToBackRack2,
    /// Neutral-point-clamped converter
    NeutralPointClamped,
}

impl Topology {
    /// Enable-command mailboxes, `None` when the variant has no CAN enables
    pub const fn enable_command_ids(&self) -> Option<EnableCommandIds> {
        match self {
            Topology::BackToBackRack1 => Some(EnableCommandIds {
                afe: 0x1000_0000,
                inv: 0x1000_0001,
            }),
            Topology::BackToBackRack2 => Some(EnableCommandIds {
                afe: 0x1000_0002,
                inv: 0x1000_0003,
            }),
            Topology::NeutralPointClamped => None,
        }
    }

    /// ADC inputs mirrored on DAC channels 2..4, one triple per monitor frame
    pub const fn monitor_channels(&self) -> [[AdcChannel; 3]; 2] {
        match self {
            Topology::BackToBackRack1 | Topology::BackToBackRack2 => [
                // inverter output voltages
                [AdcChannel::A0, AdcChannel::A1, AdcChannel::A6],
                // inverter output currents
                [AdcChannel::A2, AdcChannel::A3, AdcChannel::A4],
            ],
            Topology::NeutralPointClamped => [
                // vab, ia, upper bus half
                [AdcChannel::B0, AdcChannel::B2, AdcChannel::A0],
                // lower bus half, positive and negative rail currents
                [AdcChannel::A1, AdcChannel::A2, AdcChannel::A3],
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rack_mailboxes() {
        let rack1 = Topology::BackToBackRack1.enable_command_ids().unwrap();
        assert_eq!(rack1.afe, 0x1000_0000);
        assert_eq!(rack1.inv, 0x1000_0001);

        let rack2 = Topology::BackToBackRack2.enable_command_ids().unwrap();
        assert_eq!(rack2.afe, 0x1000_0002);
        assert_eq!(rack2.inv, 0x1000_0003);

        assert!(Topology::NeutralPointClamped.enable_command_ids().is_none());
    }

    #[test]
    fn test_monitor_channels_differ_per_variant() {
        let b2b = Topology::BackToBackRack2.monitor_channels();
        let npc = Topology::NeutralPointClamped.monitor_channels();
        assert_eq!(b2b[0], [AdcChannel::A0, AdcChannel::A1, AdcChannel::A6]);
        assert_eq!(npc[0], [AdcChannel::B0, AdcChannel::B2, AdcChannel::A0]);
        assert_ne!(b2b, npc);
    }
}
