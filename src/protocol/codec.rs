//! Packet codec (encode/decode)
//!
//! Pure functions: no I/O, no retries, no state.

use bytes::Bytes;

use super::{
    ActuatorId, ErrorFlags, HEADER, Instruction, MAX_PARAMETERS, MIN_PACKET_SIZE, ProtocolError,
    StatusPacket, idx,
};

/// One's-complement of the byte sum, truncated to 8 bits.
///
/// Callers pass the id-through-last-parameter slice; the header and the checksum slot
/// itself are not covered.
#[inline]
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

pub(crate) fn check_parameter_count(count: usize) -> Result<(), ProtocolError> {
    if count > MAX_PARAMETERS {
        return Err(ProtocolError::InvalidArgument {
            count,
            max: MAX_PARAMETERS,
        });
    }
    Ok(())
}

/// Lay out a packet. `parameters` must already be within [`MAX_PARAMETERS`].
pub(crate) fn write_packet(id: u8, op: u8, parameters: &[u8]) -> Vec<u8> {
    debug_assert!(parameters.len() <= MAX_PARAMETERS);
    let mut bytes = Vec::with_capacity(MIN_PACKET_SIZE + parameters.len());
    bytes.extend_from_slice(&HEADER);
    bytes.push(id);
    bytes.push((parameters.len() + 2) as u8);
    bytes.push(op);
    bytes.extend_from_slice(parameters);
    let sum = checksum(&bytes[idx::ID..]);
    bytes.push(sum);
    bytes
}

/// Encode an instruction packet
///
/// # Format
///
/// ```text
/// [FF FF] [ID] [LEN = params + 2] [INSTRUCTION] [PARAMS..] [CHECKSUM]
/// ```
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidId`] for `Unicast` ids above 253 and
/// [`ProtocolError::InvalidArgument`] if `parameters` is longer than [`MAX_PARAMETERS`].
/// Both are caller bugs, never bus faults.
pub fn encode_instruction(
    id: ActuatorId,
    instruction: Instruction,
    parameters: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let id = id.validate()?;
    check_parameter_count(parameters.len())?;
    Ok(write_packet(id.as_u8(), instruction.as_u8(), parameters))
}

/// Encode a broadcast `SyncWrite` that puts one data block per actuator at `address`.
///
/// Parameters are laid out as `[address, width, id_1, data_1.., id_2, data_2..]`; every
/// data block must have the same width.
pub fn encode_sync_write(
    address: u8,
    entries: &[(u8, &[u8])],
) -> Result<Vec<u8>, ProtocolError> {
    let width = match entries.first() {
        Some((_, data)) if !data.is_empty() => data.len(),
        _ => return Err(ProtocolError::EmptySyncWrite),
    };

    let mut parameters = Vec::with_capacity(2 + entries.len() * (width + 1));
    parameters.push(address);
    parameters.push(u8::try_from(width).map_err(|_| ProtocolError::InvalidArgument {
        count: width,
        max: usize::from(u8::MAX),
    })?);
    for &(id, data) in entries {
        if let ActuatorId::Broadcast = ActuatorId::new(id)? {
            return Err(ProtocolError::InvalidId { id });
        }
        if data.len() != width {
            return Err(ProtocolError::RaggedSyncWrite {
                id,
                expected: width,
                found: data.len(),
            });
        }
        parameters.push(id);
        parameters.extend_from_slice(data);
    }

    encode_instruction(ActuatorId::Broadcast, Instruction::SyncWrite, &parameters)
}

/// Validate a status packet and split it into error flags and parameters.
///
/// Checks run in order and stop at the first failure:
///
/// 1. at least [`MIN_PACKET_SIZE`] bytes
/// 2. header is `FF FF`
/// 3. id equals `expected_id`
/// 4. declared length equals `bytes.len() - 4`
/// 5. checksum over id..last parameter equals the last byte
///
/// # Errors
///
/// The first violated check, as a [`ProtocolError`].
pub fn decode_status(bytes: &[u8], expected_id: u8) -> Result<StatusPacket, ProtocolError> {
    decode_status_owned(Bytes::copy_from_slice(bytes), expected_id)
}

/// Same as [`decode_status`], but slices parameters out of `bytes` without copying.
pub(crate) fn decode_status_owned(
    bytes: Bytes,
    expected_id: u8,
) -> Result<StatusPacket, ProtocolError> {
    let total = bytes.len();
    if total < MIN_PACKET_SIZE {
        return Err(ProtocolError::BufferTooSmall {
            needed: MIN_PACKET_SIZE,
            got: total,
        });
    }

    if bytes[..2] != HEADER {
        return Err(ProtocolError::BadHeader {
            found: [bytes[0], bytes[1]],
        });
    }

    let id = bytes[idx::ID];
    if id != expected_id {
        return Err(ProtocolError::IdMismatch {
            expected: expected_id,
            found: id,
        });
    }

    let declared = usize::from(bytes[idx::LENGTH]);
    if declared != total - 4 {
        return Err(ProtocolError::LengthMismatch {
            declared,
            actual: total - 4,
        });
    }

    let expected = checksum(&bytes[idx::ID..total - 1]);
    let found = bytes[total - 1];
    if expected != found {
        return Err(ProtocolError::ChecksumMismatch { expected, found });
    }

    let error = ErrorFlags::from_bits(bytes[idx::ERROR]);
    let parameters = bytes.slice(idx::PARAM_0..total - 1);
    Ok(StatusPacket::from_parts(id, error, parameters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ActuatorCondition;

    #[test]
    fn test_encode_read_present_position() {
        let bytes = encode_instruction(ActuatorId::Unicast(1), Instruction::Read, &[36, 2]).unwrap();
        // 0x01 + 0x04 + 0x02 + 0x24 + 0x02 = 0x2D, !0x2D = 0xD2
        assert_eq!(bytes, [0xFF, 0xFF, 0x01, 0x04, 0x02, 0x24, 0x02, 0xD2]);
        assert_eq!(checksum(&[0x01, 0x04, 0x02, 0x24, 0x02]), 0xD2);
    }

    #[test]
    fn test_encode_ping_without_parameters() {
        let bytes = encode_instruction(ActuatorId::Unicast(1), Instruction::Ping, &[]).unwrap();
        assert_eq!(bytes, [0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]);
    }

    #[test]
    fn test_encode_rejects_oversized_parameters() {
        let params = vec![0u8; MAX_PARAMETERS + 1];
        let result = encode_instruction(ActuatorId::Unicast(1), Instruction::Write, &params);
        assert!(matches!(result, Err(ProtocolError::InvalidArgument { .. })));

        let params = vec![0u8; MAX_PARAMETERS];
        let bytes = encode_instruction(ActuatorId::Unicast(1), Instruction::Write, &params).unwrap();
        assert_eq!(bytes[idx::LENGTH], 0xFF);
    }

    #[test]
    fn test_encode_rejects_unicast_outside_range() {
        for id in [254, 255] {
            assert_eq!(
                encode_instruction(ActuatorId::Unicast(id), Instruction::Write, &[30, 0]),
                Err(ProtocolError::InvalidId { id })
            );
        }
    }

    #[test]
    fn test_decode_present_position_reply() {
        let status = decode_status(&[0xFF, 0xFF, 0x01, 0x04, 0x00, 0x12, 0x03, 0xE5], 1).unwrap();
        assert!(status.error().is_empty());
        assert_eq!(&status.parameters()[..], &[0x12, 0x03]);
        let value = u16::from_le_bytes([status.parameters()[0], status.parameters()[1]]);
        assert_eq!(value, 786);
    }

    #[test]
    fn test_decode_is_idempotent() {
        let reply = [0xFF, 0xFF, 0x01, 0x04, 0x00, 0x12, 0x03, 0xE5];
        let first = decode_status(&reply, 1).unwrap();
        let second = decode_status(&reply, 1).unwrap();
        assert_eq!(first.error(), second.error());
        assert_eq!(first.parameters(), second.parameters());
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let result = decode_status(&[0xFF, 0xFF, 0x01, 0x04, 0x00, 0x12, 0x03, 0xE6], 1);
        assert_eq!(
            result,
            Err(ProtocolError::ChecksumMismatch {
                expected: 0xE5,
                found: 0xE6
            })
        );
    }

    #[test]
    fn test_decode_check_order() {
        // Bad header wins even when the id is wrong too.
        let result = decode_status(&[0xFF, 0x00, 0x09, 0x02, 0x00, 0x00], 1);
        assert!(matches!(result, Err(ProtocolError::BadHeader { found: [0xFF, 0x00] })));

        let result = decode_status(&[0xFF, 0xFF, 0x09, 0x02, 0x00, 0x00], 1);
        assert!(matches!(
            result,
            Err(ProtocolError::IdMismatch {
                expected: 1,
                found: 9
            })
        ));

        let result = decode_status(&[0xFF, 0xFF, 0x01, 0x05, 0x00, 0x00], 1);
        assert!(matches!(
            result,
            Err(ProtocolError::LengthMismatch {
                declared: 5,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_decode_buffer_too_small() {
        let result = decode_status(&[0xFF, 0xFF, 0x01, 0x02, 0x00], 1);
        assert!(matches!(
            result,
            Err(ProtocolError::BufferTooSmall { needed: 6, got: 5 })
        ));
    }

    #[test]
    fn test_decode_error_flags() {
        let packet = write_packet(1, ActuatorCondition::Overheat.bit(), &[]);
        let status = decode_status(&packet, 1).unwrap();
        assert_eq!(status.error().conditions(), vec![ActuatorCondition::Overheat]);
        assert!(status.parameters().is_empty());
    }

    #[test]
    fn test_sync_write_layout() {
        let bytes = encode_sync_write(30, &[(1, &[0x10, 0x00][..]), (2, &[0x20, 0x01][..])]).unwrap();
        assert_eq!(&bytes[..5], &[0xFF, 0xFF, 0xFE, 0x0A, 0x83]);
        assert_eq!(&bytes[5..11], &[30, 2, 1, 0x10, 0x00, 2]);
        assert_eq!(checksum(&bytes[2..bytes.len() - 1]), bytes[bytes.len() - 1]);
    }

    #[test]
    fn test_sync_write_rejects_bad_shapes() {
        assert_eq!(encode_sync_write(30, &[]), Err(ProtocolError::EmptySyncWrite));
        assert_eq!(
            encode_sync_write(30, &[(1, &[1, 2][..]), (2, &[1][..])]),
            Err(ProtocolError::RaggedSyncWrite {
                id: 2,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            encode_sync_write(30, &[(0xFE, &[1][..])]),
            Err(ProtocolError::InvalidId { id: 0xFE })
        );
    }

    // Property-based tests
    #[cfg(test)]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn instruction_strategy() -> impl Strategy<Value = Instruction> {
            prop_oneof![
                Just(Instruction::Ping),
                Just(Instruction::Read),
                Just(Instruction::Write),
                Just(Instruction::RegWrite),
                Just(Instruction::Action),
                Just(Instruction::Reset),
                Just(Instruction::SyncWrite),
            ]
        }

        fn parameters_strategy() -> impl Strategy<Value = Vec<u8>> {
            prop::collection::vec(any::<u8>(), 0..=MAX_PARAMETERS)
        }

        proptest! {
            /// Property: the trailing byte always matches an independent recomputation
            #[test]
            fn prop_encoded_checksum_matches(
                id in 0u8..=0xFE,
                instruction in instruction_strategy(),
                parameters in parameters_strategy(),
            ) {
                let id = ActuatorId::new(id).unwrap();
                let bytes = encode_instruction(id, instruction, &parameters).unwrap();

                let sum: u32 = bytes[2..bytes.len() - 1].iter().map(|&b| u32::from(b)).sum();
                let independent = !(sum as u8);
                prop_assert_eq!(bytes[bytes.len() - 1], independent);
                prop_assert_eq!(usize::from(bytes[3]), parameters.len() + 2);
            }

            /// Property: flipping any single bit past the length byte fails the checksum
            #[test]
            fn prop_bit_flip_detected(
                error in any::<u8>(),
                parameters in prop::collection::vec(any::<u8>(), 0..32),
                offset_ratio in 0.0f64..1.0,
                bit in 0u8..8,
            ) {
                let mut bytes = write_packet(1, error, &parameters);
                let covered = bytes.len() - idx::ERROR;
                let offset = idx::ERROR + ((covered as f64 * offset_ratio) as usize).min(covered - 1);
                bytes[offset] ^= 1 << bit;

                let result = decode_status(&bytes, 1);
                prop_assert!(
                    matches!(result, Err(ProtocolError::ChecksumMismatch { .. })),
                    "flip at {} went undetected: {:?}", offset, result
                );
            }

            /// Property: any single bit flip anywhere is rejected
            #[test]
            fn prop_any_bit_flip_rejected(
                parameters in prop::collection::vec(any::<u8>(), 0..32),
                offset_ratio in 0.0f64..1.0,
                bit in 0u8..8,
            ) {
                let mut bytes = write_packet(1, 0, &parameters);
                let offset = ((bytes.len() as f64 * offset_ratio) as usize).min(bytes.len() - 1);
                bytes[offset] ^= 1 << bit;
                prop_assert!(decode_status(&bytes, 1).is_err());
            }

            /// Property: replies from another actuator are rejected regardless of checksum
            #[test]
            fn prop_foreign_id_rejected(
                expected in any::<u8>(),
                found in any::<u8>(),
                parameters in prop::collection::vec(any::<u8>(), 0..16),
            ) {
                prop_assume!(expected != found);
                let bytes = write_packet(found, 0, &parameters);
                prop_assert_eq!(
                    decode_status(&bytes, expected),
                    Err(ProtocolError::IdMismatch { expected, found })
                );
            }

            /// Property: decoding is a pure function of its input
            #[test]
            fn prop_decode_idempotent(
                error in any::<u8>(),
                parameters in prop::collection::vec(any::<u8>(), 0..64),
            ) {
                let bytes = write_packet(7, error, &parameters);
                let first = decode_status(&bytes, 7).unwrap();
                let second = decode_status(&bytes, 7).unwrap();
                prop_assert_eq!(first.error().bits(), error);
                prop_assert_eq!(first.parameters().as_ref(), parameters.as_slice());
                prop_assert_eq!(first, second);
            }
        }
    }
}
