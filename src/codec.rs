//! Topic round-trip through Telegram message text.
//!
//! The webhook is stateless: nothing survives between the message that
//! captures a topic and the callback that confirms it. The topic is therefore
//! embedded in the preview text itself and recovered from the message the
//! confirm button is attached to, with no session store in between.

/// Leads the preview message; everything after it up to the stop marker is
/// the topic.
pub const PREVIEW_PREFIX: &str = "🔎 Предпросмотр заявки:\n\nТема: ";

/// Shown under the topic in the preview. The stop marker below must stay a
/// prefix of `"\n\n"` + this hint.
pub const CONFIRM_HINT: &str = "Если всё верно — нажми кнопку ниже.";

const STOP_MARKER: &str = "\n\nЕсли всё верно";

/// Build the preview text for a captured topic.
pub fn encode(topic: &str) -> String {
    format!("{PREVIEW_PREFIX}{topic}\n\n{CONFIRM_HINT}")
}

/// Recover the topic from a previously sent preview message.
///
/// Returns `None` when the prefix is missing or the recovered topic trims to
/// empty. A topic that itself contains the stop marker is truncated at its
/// first occurrence.
pub fn decode(message_text: &str) -> Option<String> {
    let start = message_text.find(PREVIEW_PREFIX)?;
    let after = &message_text[start + PREVIEW_PREFIX.len()..];
    let topic = match after.find(STOP_MARKER) {
        Some(end) => &after[..end],
        None => after,
    };
    let topic = topic.trim();
    if topic.is_empty() {
        None
    } else {
        Some(topic.to_string())
    }
}
