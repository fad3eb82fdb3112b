use std::io::Write;
use std::path::Path;

use dtxprims_frame::{MessageWriter, OutgoingMessage};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let message = outgoing(&args)?;
    let wire = encode(&message, args.max_fragment_body)?;
    tracing::info!(
        identifier = message.identifier,
        bytes = wire.len(),
        fragmented = args.max_fragment_body.is_some(),
        "message encoded"
    );

    let out = if args.hex {
        let mut text = hex::encode(&wire).into_bytes();
        text.push(b'\n');
        text
    } else {
        wire
    };
    write_output(&args.path, &out)?;
    Ok(SUCCESS)
}

fn outgoing(args: &EncodeArgs) -> CliResult<OutgoingMessage> {
    Ok(OutgoingMessage {
        identifier: args.identifier,
        conversation_index: args.conversation,
        channel_code: args.channel,
        expects_reply: args.expects_reply,
        message_type: args.message_type,
        flags: 0,
        auxiliary: parse_hex_arg("--auxiliary", args.auxiliary.as_deref())?.into(),
        payload: parse_hex_arg("--payload", args.payload.as_deref())?.into(),
    })
}

fn encode(message: &OutgoingMessage, max_fragment_body: Option<usize>) -> CliResult<Vec<u8>> {
    let mut writer = match max_fragment_body {
        Some(0) => return Err(CliError::new(USAGE, "--max-fragment-body must be at least 1")),
        Some(max) => MessageWriter::with_max_fragment_body(Vec::new(), max),
        None => MessageWriter::new(Vec::new()),
    };
    let frames = writer
        .send(message)
        .map_err(|err| frame_error("encode failed", err))?;
    tracing::debug!(frames, "frames written");
    Ok(writer.into_inner())
}

fn parse_hex_arg(flag: &str, value: Option<&str>) -> CliResult<Vec<u8>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    hex::decode(value.trim())
        .map_err(|err| CliError::new(USAGE, format!("{flag}: invalid hex: {err}")))
}

fn write_output(path: &Path, bytes: &[u8]) -> CliResult<()> {
    if path.as_os_str() == "-" {
        let mut stdout = std::io::stdout().lock();
        return stdout
            .write_all(bytes)
            .and_then(|()| stdout.flush())
            .map_err(|err| io_error("failed writing stdout", err));
    }
    std::fs::write(path, bytes)
        .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))
}
