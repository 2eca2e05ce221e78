use crate::proxy::mappers::content::{ContentBlock, Message, WireFormat};

/// Classify a conversation by the block shapes it already uses.
///
/// Any native tool or thinking block anywhere makes it `Native`; the generic
/// side channel alone never does.
pub fn detect(messages: &[Message]) -> WireFormat {
    let native = messages.iter().flat_map(|m| m.content.iter()).any(ContentBlock::is_native);
    if native {
        WireFormat::Native
    } else {
        WireFormat::Foreign
    }
}
