// CAN enable command decoding

use embedded_can::{ExtendedId, Id};

use crate::config::Topology;
use crate::hardware::Stage;

/// Decoded stage enable command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnableCommand {
    pub stage: Stage,
    pub enabled: bool,
}

/// Reasons a received frame is not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Identifier is not an enable mailbox of this topology
    UnknownId,
    /// Frame carries no data
    EmptyPayload,
    /// Byte 0 is neither 0 nor 1
    InvalidValue(u8),
}

/// Extended identifiers the CAN filter should accept
///
/// Empty for topologies that take no CAN enables.
pub fn enable_filter_ids(topology: Topology) -> Option<[ExtendedId; 2]> {
    let ids = topology.enable_command_ids()?;
    Some([ExtendedId::new(ids.afe)?, ExtendedId::new(ids.inv)?])
}

/// Parse an enable command from CAN data
///
/// # Arguments
/// * `data` - CAN frame data, byte 0 is the command
///
/// # Returns
/// * `Ok(true)` / `Ok(false)` for 1 / 0
/// * `Err` for an empty payload or any other value
pub fn parse_enable_command(data: &[u8]) -> Result<bool, CommandError> {
    match data.first() {
        None => Err(CommandError::EmptyPayload),
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        Some(&other) => Err(CommandError::InvalidValue(other)),
    }
}

/// Map a received frame onto a stage enable
pub fn decode_enable_frame(
    topology: Topology,
    id: Id,
    data: &[u8],
) -> Result<EnableCommand, CommandError> {
    let ids = topology
        .enable_command_ids()
        .ok_or(CommandError::UnknownId)?;

    let raw = match id {
        Id::Extended(ext_id) => ext_id.as_raw(),
        Id::Standard(_) => return Err(CommandError::UnknownId),
    };

    let stage = if raw == ids.afe {
        Stage::Rectifier
    } else if raw == ids.inv {
        Stage::Inverter
    } else {
        return Err(CommandError::UnknownId);
    };

    let enabled = parse_enable_command(data)?;
    Ok(EnableCommand { stage, enabled })
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_can::StandardId;

    fn ext(raw: u32) -> Id {
        Id::Extended(ExtendedId::new(raw).unwrap())
    }

    #[test]
    fn test_rack1_enable_and_disable() {
        let cmd = decode_enable_frame(Topology::BackToBackRack1, ext(0x1000_0000), &[1]);
        assert_eq!(
            cmd,
            Ok(EnableCommand {
                stage: Stage::Rectifier,
                enabled: true
            })
        );
        let cmd = decode_enable_frame(Topology::BackToBackRack1, ext(0x1000_0001), &[0, 9, 9]);
        assert_eq!(
            cmd,
            Ok(EnableCommand {
                stage: Stage::Inverter,
                enabled: false
            })
        );
    }

    #[test]
    fn test_rack2_ids() {
        let cmd = decode_enable_frame(Topology::BackToBackRack2, ext(0x1000_0003), &[1]);
        assert_eq!(cmd.map(|c| c.stage), Ok(Stage::Inverter));
        // Rack-1 ids mean nothing on rack 2
        let cmd = decode_enable_frame(Topology::BackToBackRack2, ext(0x1000_0000), &[1]);
        assert_eq!(cmd, Err(CommandError::UnknownId));
    }

    #[test]
    fn test_npc_has_no_enables() {
        let cmd = decode_enable_frame(Topology::NeutralPointClamped, ext(0x1000_0000), &[1]);
        assert_eq!(cmd, Err(CommandError::UnknownId));
        assert!(enable_filter_ids(Topology::NeutralPointClamped).is_none());
    }

    #[test]
    fn test_ignored_payloads() {
        let topology = Topology::BackToBackRack1;
        assert_eq!(
            decode_enable_frame(topology, ext(0x1000_0000), &[]),
            Err(CommandError::EmptyPayload)
        );
        assert_eq!(
            decode_enable_frame(topology, ext(0x1000_0000), &[2]),
            Err(CommandError::InvalidValue(2))
        );
        let standard = Id::Standard(StandardId::new(0x100).unwrap());
        assert_eq!(
            decode_enable_frame(topology, standard, &[1]),
            Err(CommandError::UnknownId)
        );
    }

    #[test]
    fn test_filter_ids() {
        let ids = enable_filter_ids(Topology::BackToBackRack1).unwrap();
        assert_eq!(ids[0].as_raw(), 0x1000_0000);
        assert_eq!(ids[1].as_raw(), 0x1000_0001);
    }
}
