//! Delivery of a confirmed request to the support chat.
//!
//! One attempt per confirmation. Success and failure both end in an edit of
//! the preview message; the raw Telegram error only ever reaches the log.

use anyhow::Result;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, MaybeInaccessibleMessage, ParseMode, User};
use teloxide::{ApiError, RequestError};
use tracing::{error, info, warn};

use crate::bot::AppState;
use crate::codec;

const RESUBMIT_TEXT: &str =
    "Не удалось извлечь тему заявки. Пришли текст темы сообщением ещё раз.";

const SENT_TEXT: &str = "✅ Заявка отправлена. Мы свяжемся с тобой в личке при необходимости.";

/// Handle a press of the confirm button: recover the topic from the preview
/// message, relay it to the support chat, edit the preview with the outcome.
pub async fn handle_confirm(state: &AppState, query: &CallbackQuery) -> Result<()> {
    let Some(preview) = query.message.as_ref() else {
        warn!("Confirm callback without a message reference; nothing to edit");
        return Ok(());
    };

    // An inaccessible preview carries no text, so decoding fails below and
    // the user is asked to resubmit.
    let (chat_id, message_id, text) = match preview {
        MaybeInaccessibleMessage::Regular(msg) => (msg.chat.id, msg.id, msg.text()),
        MaybeInaccessibleMessage::Inaccessible(msg) => (msg.chat.id, msg.message_id, None),
    };

    let Some(topic) = text.and_then(codec::decode) else {
        state
            .bot
            .edit_message_text(chat_id, message_id, RESUBMIT_TEXT)
            .await?;
        return Ok(());
    };

    let notification = build_notification(&query.from, &topic);

    match state
        .bot
        .send_message(ChatId(state.config.support_chat_id), notification)
        .parse_mode(ParseMode::Html)
        .await
    {
        Ok(_) => {
            info!("Relayed request from user {} to support chat", query.from.id);
            state
                .bot
                .edit_message_text(chat_id, message_id, SENT_TEXT)
                .await?;
        }
        Err(e) => {
            error!(
                "{} (chat {}): {e}",
                delivery_failure_detail(&e),
                state.config.support_chat_id
            );
            let text = remediation_text(
                state.bot_username().await.as_deref(),
                state.config.support_username.as_deref(),
            );
            state
                .bot
                .edit_message_text(chat_id, message_id, text)
                .await?;
        }
    }

    Ok(())
}

/// Support-facing notification. Every user-controlled field is HTML-escaped
/// before insertion; the message is sent with HTML parse mode.
fn build_notification(from: &User, topic: &str) -> String {
    let mention = format!(
        r#"<a href="tg://user?id={}">{}</a>"#,
        from.id,
        escape_html(&from.full_name())
    );
    let username = match from.username.as_deref() {
        Some(handle) => format!("@{handle}"),
        None => "—".to_string(),
    };

    format!(
        "📩 Новая заявка\n\nОт: {mention}\nUser ID: <code>{}</code>\nUsername: {}\n\nТема: {}",
        from.id,
        escape_html(&username),
        escape_html(topic)
    )
}

/// Escape the three characters Telegram's HTML parse mode treats as markup.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Shown to the submitter when delivery fails. A human has to remediate and
/// the user resubmits; there is no automatic retry.
fn remediation_text(bot_username: Option<&str>, support_username: Option<&str>) -> String {
    let mut text = String::from(
        "Не удалось отправить заявку модератору.\n\n\
         Возможные причины:\n\
         • Аккаунт модератора ещё не писал боту (/start)\n\
         • Бот заблокирован модератором\n\n\
         Попроси модератора один раз написать этому боту.",
    );
    if let Some(bot) = bot_username {
        text.push_str(&format!(" Ссылка на бота: https://t.me/{bot}."));
    }
    text.push_str(" После этого отправка заработает.");
    if let Some(handle) = support_username {
        text.push_str(&format!("\n\nСвязаться с модератором напрямую: @{handle}"));
    }
    text
}

/// Operator-facing classification of a failed delivery. The submitter always
/// sees the same remediation text.
fn delivery_failure_detail(err: &RequestError) -> &'static str {
    match err {
        RequestError::Api(ApiError::BotBlocked) => "Support recipient has blocked the bot",
        RequestError::Api(ApiError::CantInitiateConversation) => {
            "Support recipient has never messaged the bot"
        }
        RequestError::Api(ApiError::ChatNotFound) => "Support chat not found",
        _ => "Failed to deliver request to support chat",
    }
}
