//! Transmit frame assembly

use crate::checksum;
use crate::layout::{self, COUNT_IDX, DATA_IDX, OPCODE_IDX, PARAM1_IDX, PARAM2_IDX};
use crate::types::{BadParameter, Command, Config, Opcode};
use crate::validate;

/// Writes the frame for an already validated command into `tx`.
///
/// Layout: `[count][opcode][param1][param2 lo][param2 hi][data1][data2][data3][crc lo][crc hi]`.
/// Returns the frame length, which is also the count byte.
pub(crate) fn assemble(opcode: Opcode, command: &Command<'_>, tx: &mut [u8]) -> usize {
    let len = command.frame_len();
    let param2 = layout::encode_param2(opcode, command.param1, command.param2);

    tx[COUNT_IDX] = len as u8;
    tx[OPCODE_IDX] = opcode as u8;
    tx[PARAM1_IDX] = command.param1;
    tx[PARAM2_IDX..DATA_IDX].copy_from_slice(&param2.to_le_bytes());

    let mut pos = DATA_IDX;
    for block in [command.data1, command.data2, command.data3] {
        tx[pos..pos + block.len()].copy_from_slice(block);
        pos += block.len();
    }

    checksum::append(tx, pos);
    len
}

/// Validates `command` and writes its frame into `tx` without sending it.
///
/// Returns the number of frame bytes written. On error `tx` is untouched.
pub fn encode(command: &Command<'_>, config: &Config, tx: &mut [u8]) -> Result<usize, BadParameter> {
    let opcode = validate::check_command(command, tx.len(), config)?;
    Ok(assemble(opcode, command, tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::*;
    use proptest::prelude::*;

    fn encode_vec(command: &Command<'_>) -> Vec<u8> {
        let mut tx = [0u8; CMD_SIZE_MAX];
        let len = encode(command, &Config::default(), &mut tx).unwrap();
        tx[..len].to_vec()
    }

    #[test]
    fn test_random_frame() {
        let frame = encode_vec(&Command::new(Opcode::Random as u8, RANDOM_SEED_UPDATE, 0));
        assert_eq!(frame, [0x07, 0x1B, 0x00, 0x00, 0x00, 0x24, 0xCD]);
    }

    #[test]
    fn test_dev_rev_frame() {
        let frame = encode_vec(&Command::new(Opcode::DevRev as u8, 0, 0));
        assert_eq!(frame, [0x07, 0x30, 0x00, 0x00, 0x00, 0x03, 0x5D]);
    }

    #[test]
    fn test_param2_little_endian() {
        let frame = encode_vec(&Command::new(Opcode::Hmac as u8, 0x04, 0x1234));
        assert_eq!(frame[PARAM2_IDX], 0x34);
        assert_eq!(frame[PARAM2_IDX + 1], 0x12);
    }

    #[test]
    fn test_three_blocks_in_order() {
        let challenge = [0xC1u8; 32];
        let response = [0xD2u8; 32];
        let other = [0xE3u8; 13];
        let command = Command::new(Opcode::CheckMac as u8, 0, 3)
            .with_data1(&challenge)
            .with_data2(&response)
            .with_data3(&other);
        let frame = encode_vec(&command);

        assert_eq!(frame.len(), 84);
        assert_eq!(&frame[5..37], &challenge);
        assert_eq!(&frame[37..69], &response);
        assert_eq!(&frame[69..82], &other);
        assert_eq!(&frame[82..], &checksum::calculate(&frame[..82]));
    }

    #[test]
    fn test_write_data_zone_word_address() {
        let value = [1u8, 2, 3, 4];
        let frame = encode_vec(&Command::new(Opcode::Write as u8, ZONE_DATA, 0x0040).with_data1(&value));
        assert_eq!(frame[0], 11);
        assert_eq!(frame[PARAM2_IDX], 0x10);
        assert_eq!(frame[PARAM2_IDX + 1], 0x00);
        assert_eq!(&frame[DATA_IDX..DATA_IDX + 4], &value);
    }

    #[test]
    fn test_rejected_command_leaves_buffer_untouched() {
        let mut tx = [0xAAu8; CMD_SIZE_MAX];
        let result = encode(&Command::new(Opcode::Random as u8, 2, 0), &Config::default(), &mut tx);
        assert!(result.is_err());
        assert!(tx.iter().all(|&b| b == 0xAA));
    }

    proptest! {
        #[test]
        fn prop_frame_length_counts_every_byte(
            mode in 0u8..=1,
            numin in proptest::collection::vec(any::<u8>(), NONCE_NUMIN_SIZE),
        ) {
            let command = Command::new(Opcode::Nonce as u8, mode, 0).with_data1(&numin);
            let frame = encode_vec(&command);
            prop_assert_eq!(frame[COUNT_IDX] as usize, frame.len());
            prop_assert_eq!(frame.len(), CMD_SIZE_MIN + NONCE_NUMIN_SIZE);
            prop_assert!(checksum::verify(&frame));
        }

        #[test]
        fn prop_unchecked_blocks_frame_length(
            data1 in proptest::collection::vec(any::<u8>(), 0..32),
            data2 in proptest::collection::vec(any::<u8>(), 0..32),
            data3 in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let config = Config { check_parameters: false };
            let command = Command::new(Opcode::Pause as u8, 0, 0)
                .with_data1(&data1)
                .with_data2(&data2)
                .with_data3(&data3);
            let mut tx = [0u8; 100];
            let len = encode(&command, &config, &mut tx).unwrap();
            prop_assert_eq!(len, 1 + 1 + 1 + 2 + data1.len() + data2.len() + data3.len() + 2);
            prop_assert_eq!(tx[COUNT_IDX] as usize, len);
            prop_assert_eq!(&tx[DATA_IDX + data1.len()..DATA_IDX + data1.len() + data2.len()], &data2[..]);
            prop_assert!(checksum::verify(&tx[..len]));
        }

        #[test]
        fn prop_encoding_is_deterministic(
            mode in prop_oneof![Just(0u8), Just(MAC_MODE_INCLUDE_SN), Just(MAC_MODE_INCLUDE_OTP_64)],
            key_id in any::<u16>(),
            challenge in proptest::collection::vec(any::<u8>(), MAC_CHALLENGE_SIZE),
        ) {
            let command = Command::new(Opcode::Mac as u8, mode, key_id).with_data1(&challenge);
            prop_assert_eq!(encode_vec(&command), encode_vec(&command));
        }
    }
}
