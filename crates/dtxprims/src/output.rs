use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dtxprims_frame::{message_type_label, AuxiliaryDictionary, Message, Object};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    identifier: u32,
    conversation_index: u32,
    channel_code: u32,
    expects_reply: bool,
    fragment_index: u16,
    fragment_count: u16,
    message_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_type: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_type_name: Option<String>,
    auxiliary_length: i32,
    payload_length: i32,
    auxiliary: &'a AuxiliaryDictionary,
    payload: &'a [Object],
    #[serde(skip_serializing_if = "Option::is_none")]
    fragment_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

impl<'a> MessageOutput<'a> {
    fn new(message: &'a Message, verbose: bool) -> Self {
        Self {
            identifier: message.identifier(),
            conversation_index: message.conversation_index(),
            channel_code: message.channel_code(),
            expects_reply: message.expects_reply(),
            fragment_index: message.fragment_index(),
            fragment_count: message.fragment_count(),
            message_length: message.message_length(),
            message_type: message.message_type(),
            message_type_name: message.message_type().map(message_type_label),
            auxiliary_length: message
                .payload_header()
                .map_or(0, |ph| ph.auxiliary_length),
            payload_length: message.payload_length(),
            auxiliary: message.auxiliary(),
            payload: message.payload(),
            fragment_bytes: message
                .is_fragment()
                .then(|| message.fragment_bytes().len()),
            raw: verbose.then(|| hex::encode(message.raw_bytes())),
        }
    }
}

/// Print decoded messages. JSON is one object per line; table collects all
/// messages into a single table.
pub fn print_messages(messages: &[Message], format: OutputFormat, verbose: bool) {
    match format {
        OutputFormat::Json => {
            for message in messages {
                let out = MessageOutput::new(message, verbose);
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "ID", "CONV", "CHANNEL", "REPLY", "TYPE", "FRAGMENT", "LENGTH", "AUX",
                    "PAYLOAD",
                ]);
            for message in messages {
                table.add_row(vec![
                    message.identifier().to_string(),
                    message.conversation_index().to_string(),
                    message.channel_code().to_string(),
                    if message.expects_reply() { "yes" } else { "no" }.to_string(),
                    message
                        .message_type()
                        .map(message_type_label)
                        .unwrap_or_else(|| "-".to_string()),
                    fragment_label(message),
                    message.message_length().to_string(),
                    message.auxiliary().len().to_string(),
                    payload_preview(message),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for message in messages {
                if verbose {
                    println!("{}\n", message.to_debug_string());
                } else {
                    println!("{message}");
                }
            }
        }
    }
}

fn fragment_label(message: &Message) -> String {
    if message.is_fragment() {
        format!("{}/{}", message.fragment_index(), message.fragment_count())
    } else {
        "-".to_string()
    }
}

const PREVIEW_CHARS: usize = 48;

fn payload_preview(message: &Message) -> String {
    let Some(first) = message.payload().first() else {
        return "none".to_string();
    };
    let text = first.to_string();
    if text.chars().count() <= PREVIEW_CHARS {
        return text;
    }
    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}
