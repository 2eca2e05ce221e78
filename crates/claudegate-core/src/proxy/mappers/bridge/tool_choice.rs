use tracing::debug;

use crate::proxy::mappers::content::ToolChoice;

/// Repair the caller's tool-selection directive.
///
/// A forced choice without a usable name is dropped, which the backend reads
/// as `auto`. Never errors.
pub fn sanitize(choice: Option<ToolChoice>) -> Option<ToolChoice> {
    match choice {
        Some(ToolChoice::Specific { name }) if name.trim().is_empty() => {
            debug!("[ToolChoice] Dropped forced tool choice without a name");
            None
        }
        other => other,
    }
}
