//! Known payload message types.
//!
//! Names are for diagnostics only. Decoding never branches on them.

/// Acknowledgement with no payload.
pub const ACK: i32 = 0x0;

/// Method invocation that does not expect a reply.
pub const METHOD_INVOCATION: i32 = 0x2;

/// Method invocation that expects a reply.
pub const METHOD_INVOCATION_WITH_REPLY: i32 = 0x3;

/// Returns the display name of a known message type.
pub fn message_type_name(message_type: i32) -> Option<&'static str> {
    // Labels follow the constants above; some reference wire dumps print 2 and 3
    // the other way round.
    match message_type {
        ACK => Some("Ack"),
        METHOD_INVOCATION => Some("rpc_void"),
        METHOD_INVOCATION_WITH_REPLY => Some("rpc_asking_reply"),
        _ => None,
    }
}

/// Display label for any message type, `Unknown:<n>` when not in the table.
pub fn message_type_label(message_type: i32) -> String {
    match message_type_name(message_type) {
        Some(name) => name.to_string(),
        None => format!("Unknown:{message_type}"),
    }
}
