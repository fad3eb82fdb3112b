use std::io::{Cursor, Read};
use std::path::Path;

use dtxprims_frame::{DecoderConfig, FrameError, Message, MessageDecoder, MessageReader};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_messages, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = read_input(&args.path)?;
    let bytes = if args.hex { parse_hex(&input)? } else { input };
    tracing::debug!(bytes = bytes.len(), path = %args.path.display(), "capture loaded");

    let decoder = MessageDecoder::with_config(DecoderConfig {
        max_message_length: args.max_message_length,
        ..DecoderConfig::default()
    });
    let messages = decode_all(bytes, decoder, args.raw_fragments, args.count)
        .map_err(|err| frame_error("decode failed", err))?;

    tracing::info!(messages = messages.len(), "capture decoded");
    print_messages(&messages, format, args.verbose);
    Ok(SUCCESS)
}

/// Decode every message in `bytes`, stopping cleanly at EOF on a message boundary.
pub fn decode_all(
    bytes: Vec<u8>,
    decoder: MessageDecoder,
    raw_fragments: bool,
    limit: Option<usize>,
) -> Result<Vec<Message>, FrameError> {
    let mut reader = MessageReader::with_decoder(Cursor::new(bytes), decoder);
    let mut messages = Vec::new();

    while limit.is_none_or(|max| messages.len() < max) {
        let next = if raw_fragments {
            reader.read_frame()
        } else {
            reader.read_message()
        };
        match next {
            Ok(message) => messages.push(message),
            Err(FrameError::ConnectionClosed) if reader.is_at_boundary() => break,
            Err(err) => return Err(err),
        }
    }

    Ok(messages)
}

fn read_input(path: &Path) -> CliResult<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|err| io_error("failed reading stdin", err))?;
        return Ok(buf);
    }
    std::fs::read(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

fn parse_hex(input: &[u8]) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    hex::decode(digits)
        .map_err(|err| CliError::new(USAGE, format!("--hex input is not valid hex: {err}")))
}
