//! Framed codec for the actuator serial link
//!
//! Every command is sent as one frame:
//! ```text
//! [ 0xA5 ][ address u8 ][ type u8 ][ len u16 LE ][ len bytes payload ][ CRC-16 LE ]
//! ```
//!
//! The CRC is CRC-16/ARC over everything between the sync byte and the CRC.
//! All multi-byte payload fields are little-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crc_any::CRCu16;
use thiserror::Error;

use crate::{Address, Command, LoopCount, PidCoefficients, Setpoint};

/// Sync byte opening every frame
pub const SYNC_BYTE: u8 = 0xA5;

/// Bytes before the payload: sync, address, type, length
pub const HEADER_LEN: usize = 5;

/// Bytes after the payload
pub const CRC_LEN: usize = 2;

/// Maximum number of setpoints in one sequence (bounded by controller RAM)
pub const MAX_SETPOINTS: usize = 1024;

/// Message type identifiers
pub mod msg_type {
    pub const SET_PID: u8 = 0x01;
    pub const SET_SETPOINTS: u8 = 0x02;
    pub const PING: u8 = 0x03;
    pub const RUN_SELF_TEST: u8 = 0x04;
    pub const REQUEST_POSITION: u8 = 0x05;
}

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug, PartialEq)]
pub enum CodecError {
    #[error("Setpoint sequence is empty")]
    EmptySetpoints,

    #[error("Too many setpoints: {0} (max: {MAX_SETPOINTS})")]
    TooManySetpoints(usize),

    #[error("Loop count {} collides with the forever sentinel", LoopCount::FOREVER_WIRE)]
    LoopCountCollision,

    #[error("Invalid sync byte: {0:#04x}")]
    InvalidSync(u8),

    #[error("Unknown actuator address: {0}")]
    UnknownAddress(u8),

    #[error("Unknown message type: {0:#04x}")]
    UnknownMessageType(u8),

    #[error("Invalid payload length {len} for message type {msg_type:#04x}")]
    InvalidPayloadLength { msg_type: u8, len: usize },

    #[error("Checksum mismatch: frame says {expected:#06x}, computed {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },
}

/// Encode a command for `address` into a complete frame
pub fn encode(address: Address, command: &Command) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::new();
    encode_into(address, command, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode a command directly into a provided buffer
///
/// Nothing is written to `buf` if the command cannot be encoded.
pub fn encode_into(address: Address, command: &Command, buf: &mut BytesMut) -> Result<(), CodecError> {
    let (kind, payload) = encode_payload(command)?;

    buf.reserve(HEADER_LEN + payload.len() + CRC_LEN);
    let start = buf.len();

    buf.put_u8(SYNC_BYTE);
    buf.put_u8(address.id());
    buf.put_u8(kind);
    buf.put_u16_le(payload.len() as u16);
    buf.put_slice(&payload);

    let crc = checksum(&buf[start + 1..]);
    buf.put_u16_le(crc);

    Ok(())
}

fn encode_payload(command: &Command) -> Result<(u8, BytesMut), CodecError> {
    let mut payload = BytesMut::new();

    let kind = match command {
        Command::SetPid(pid) => {
            payload.put_f32_le(pid.kp);
            payload.put_f32_le(pid.ki);
            payload.put_f32_le(pid.kd);
            msg_type::SET_PID
        }
        Command::SetSetpoints {
            delay,
            loop_count,
            setpoints,
        } => {
            if setpoints.is_empty() {
                return Err(CodecError::EmptySetpoints);
            }
            if setpoints.len() > MAX_SETPOINTS {
                return Err(CodecError::TooManySetpoints(setpoints.len()));
            }
            let loop_wire = loop_count
                .to_wire()
                .ok_or(CodecError::LoopCountCollision)?;

            payload.reserve(6 + setpoints.len() * 4);
            payload.put_u16_le(*delay);
            payload.put_u16_le(loop_wire);
            payload.put_u16_le(setpoints.len() as u16);
            for sp in setpoints {
                payload.put_u16_le(sp.duration);
                payload.put_u16_le(sp.setpoint);
            }
            msg_type::SET_SETPOINTS
        }
        Command::Ping => msg_type::PING,
        Command::RunSelfTest => msg_type::RUN_SELF_TEST,
        Command::RequestPosition => msg_type::REQUEST_POSITION,
    };

    Ok((kind, payload))
}

/// Try to decode one frame from the front of a buffer
///
/// Returns:
/// - `Ok(Some((address, command)))` if a complete frame was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the data is invalid
pub fn decode(buf: &mut BytesMut) -> Result<Option<(Address, Command)>, CodecError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }

    if buf[0] != SYNC_BYTE {
        return Err(CodecError::InvalidSync(buf[0]));
    }

    let payload_len = u16::from_le_bytes([buf[3], buf[4]]) as usize;
    let total_len = HEADER_LEN + payload_len + CRC_LEN;

    if buf.len() < total_len {
        return Ok(None);
    }

    let crc_at = HEADER_LEN + payload_len;
    let expected = u16::from_le_bytes([buf[crc_at], buf[crc_at + 1]]);
    let actual = checksum(&buf[1..crc_at]);
    if expected != actual {
        return Err(CodecError::ChecksumMismatch { expected, actual });
    }

    let mut frame = buf.split_to(total_len);
    frame.advance(1);
    let addr_id = frame.get_u8();
    let kind = frame.get_u8();
    frame.advance(2);
    frame.truncate(payload_len);

    let address = Address::from_id(addr_id).ok_or(CodecError::UnknownAddress(addr_id))?;
    let command = decode_payload(kind, frame.freeze())?;

    Ok(Some((address, command)))
}

fn decode_payload(kind: u8, mut payload: Bytes) -> Result<Command, CodecError> {
    let len = payload.len();
    let bad_len = || CodecError::InvalidPayloadLength { msg_type: kind, len };

    let command = match kind {
        msg_type::SET_PID => {
            if len != 12 {
                return Err(bad_len());
            }
            Command::SetPid(PidCoefficients {
                kp: payload.get_f32_le(),
                ki: payload.get_f32_le(),
                kd: payload.get_f32_le(),
            })
        }
        msg_type::SET_SETPOINTS => {
            if len < 6 {
                return Err(bad_len());
            }
            let delay = payload.get_u16_le();
            let loop_count = LoopCount::from_wire(payload.get_u16_le());
            let count = payload.get_u16_le() as usize;
            if count == 0 {
                return Err(CodecError::EmptySetpoints);
            }
            if payload.remaining() != count * 4 {
                return Err(bad_len());
            }
            let setpoints = (0..count)
                .map(|_| Setpoint {
                    duration: payload.get_u16_le(),
                    setpoint: payload.get_u16_le(),
                })
                .collect();
            Command::SetSetpoints {
                delay,
                loop_count,
                setpoints,
            }
        }
        msg_type::PING | msg_type::RUN_SELF_TEST | msg_type::REQUEST_POSITION => {
            if len != 0 {
                return Err(bad_len());
            }
            match kind {
                msg_type::PING => Command::Ping,
                msg_type::RUN_SELF_TEST => Command::RunSelfTest,
                _ => Command::RequestPosition,
            }
        }
        other => return Err(CodecError::UnknownMessageType(other)),
    };

    Ok(command)
}

fn checksum(data: &[u8]) -> u16 {
    let mut crc = CRCu16::crc16();
    crc.digest(data);
    crc.get_crc()
}
