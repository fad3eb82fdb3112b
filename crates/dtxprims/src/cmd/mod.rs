use clap::{Args, Subcommand};
use std::path::PathBuf;

use dtxprims_frame::DEFAULT_MAX_MESSAGE_LENGTH;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a captured DTX byte stream and print its messages.
    Decode(DecodeArgs),
    /// Encode one message (optionally fragmented) into a capture file.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to decode ("-" reads stdin).
    pub path: PathBuf,
    /// Input is hex text; whitespace is ignored.
    #[arg(long)]
    pub hex: bool,
    /// Include auxiliary header, first payload object and raw bytes.
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Print fragment markers and continuations instead of reassembling.
    #[arg(long)]
    pub raw_fragments: bool,
    /// Stop after N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Largest declared message body accepted, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_LENGTH)]
    pub max_message_length: usize,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Output file ("-" writes stdout).
    pub path: PathBuf,
    /// Message identifier.
    #[arg(long, short = 'i', default_value = "1")]
    pub identifier: u32,
    /// Conversation index.
    #[arg(long, default_value = "0")]
    pub conversation: u32,
    /// Channel code.
    #[arg(long, short = 'c', default_value = "0")]
    pub channel: u32,
    /// Payload message type.
    #[arg(long, short = 't', default_value = "2")]
    pub message_type: i32,
    /// Set the expects-reply flag.
    #[arg(long)]
    pub expects_reply: bool,
    /// Encoded auxiliary dictionary as hex.
    #[arg(long, value_name = "HEX")]
    pub auxiliary: Option<String>,
    /// Encoded payload as hex.
    #[arg(long, value_name = "HEX")]
    pub payload: Option<String>,
    /// Split bodies larger than this many bytes into fragments.
    #[arg(long, value_name = "BYTES")]
    pub max_fragment_body: Option<usize>,
    /// Write hex text instead of binary.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
