//! DTX message decoding with fragment reassembly.
//!
//! dtxprims turns raw DTX byte streams into structured messages: it validates
//! the 32-byte frame header, joins fragmented messages and locates the
//! auxiliary and payload regions for pluggable decoders.
//!
//! # Crate Structure
//!
//! - [`frame`]: header parsing, message decoding, reassembly, stream reader/writer
//!
//! The `cli` feature builds the `dtxprims` binary for inspecting captures.

/// Re-export frame types.
pub mod frame {
    pub use dtxprims_frame::*;
}
