//! MPEG transport-stream segment writing.
//!
//! This module generates the packets of a recorded segment:
//! - Program-specific information (PAT + PMT)
//! - PES-framed audio and video access units
//!
//! Every packet is 188 bytes. Counters are advanced per PID through a
//! [`ContinuityState`] that outlives the individual segment files.

mod frame;
pub mod inspect;
mod packet;
mod pes;
mod psi;
mod writer;

pub use frame::{AudioFrame, Tracks, VideoFrame};
pub use writer::SegmentWriter;

/// Size of one transport-stream packet.
pub const PACKET_SIZE: usize = 188;

/// Sync byte opening every packet.
pub const SYNC_BYTE: u8 = 0x47;

/// PID of the program association table.
pub const PID_PAT: u16 = 0x0000;

/// PID of the program map table.
pub const PID_PMT: u16 = 0x1000;

/// PID carrying video PES packets.
pub const PID_VIDEO: u16 = 0x0100;

/// PID carrying audio PES packets.
pub const PID_AUDIO: u16 = 0x0101;

/// PID used as PCR PID when a program has no elementary streams.
pub const PID_NULL: u16 = 0x1FFF;

/// The single program every segment carries.
pub const PROGRAM_NUMBER: u16 = 1;

/// Continuity counters for every PID of a session.
///
/// Each field holds the counter the *next* packet on that PID will carry.
/// Counters wrap modulo 16 and are never reset when a new segment starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuityState {
    pub pat: u8,
    pub pmt: u8,
    pub video: u8,
    pub audio: u8,
}

impl ContinuityState {
    /// Counters for a fresh session.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Convert a millisecond timestamp to the 90 kHz MPEG clock (33 bits).
pub fn to_90khz(millis: u32) -> u64 {
    (u64::from(millis) * 90) & 0x1_FFFF_FFFF
}
