use std::sync::Arc;

use anyhow::Result;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Me, Message, UpdateKind,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::Config;
use crate::relay;

/// Callback data of the confirm button.
pub const CONFIRM_ACTION: &str = "send_request";
/// Callback data of the change-topic button. Handling it never mutates
/// anything; the user just sends a new message instead.
pub const CHANGE_TOPIC_ACTION: &str = "noop";

const START_TEXT: &str = "Привет! Я приму твою заявку.\n\n\
    1) Отправь одним сообщением тему заявки (любой текст).\n\
    2) Нажми «Отправить заявку» под предпросмотром.";

const EMPTY_TOPIC_TEXT: &str =
    "Пустую тему отправить нельзя. Напиши текст темы одним сообщением.";

const CHANGE_TOPIC_HINT: &str = "Пришли новый текст темы одним сообщением.";

/// Shared application state
///
/// Read-only after startup; shared across concurrent webhook invocations.
pub struct AppState {
    pub bot: Bot,
    pub config: Config,
    me: OnceCell<Me>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let bot = Bot::new(&config.bot_token);
        Self {
            bot,
            config,
            me: OnceCell::new(),
        }
    }

    /// The bot's own username, fetched with `getMe` at most once per process.
    ///
    /// Concurrent first callers await the same in-flight request; a failure
    /// leaves the cell empty so a later invocation retries.
    pub async fn bot_username(&self) -> Option<String> {
        match self
            .me
            .get_or_try_init(|| async { self.bot.get_me().await })
            .await
        {
            Ok(me) => Some(me.username().to_string()),
            Err(e) => {
                warn!("Failed to fetch bot identity: {e}");
                None
            }
        }
    }
}

/// Route one inbound update to exactly one handler.
pub async fn handle_update(state: Arc<AppState>, update: Update) -> Result<()> {
    match update.kind {
        UpdateKind::Message(msg) => handle_message(&state, &msg).await,
        UpdateKind::CallbackQuery(query) => handle_callback(&state, &query).await,
        kind => {
            debug!("Ignoring unhandled update kind: {kind:?}");
            Ok(())
        }
    }
}

async fn handle_message(state: &AppState, msg: &Message) -> Result<()> {
    // Only text messages carry topics; stickers, photos etc. are ignored.
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if let Some(("start", _)) = parse_command(text) {
        state.bot.send_message(msg.chat.id, START_TEXT).await?;
        return Ok(());
    }

    let topic = text.trim();
    if topic.is_empty() {
        state.bot.send_message(msg.chat.id, EMPTY_TOPIC_TEXT).await?;
        return Ok(());
    }

    info!("Captured topic from chat {}", msg.chat.id);

    state
        .bot
        .send_message(msg.chat.id, codec::encode(topic))
        .reply_markup(confirm_keyboard())
        .await?;

    Ok(())
}

async fn handle_callback(state: &AppState, query: &CallbackQuery) -> Result<()> {
    match query.data.as_deref() {
        Some(CHANGE_TOPIC_ACTION) => {
            answer_callback(state, query, Some(CHANGE_TOPIC_HINT)).await;
            Ok(())
        }
        Some(CONFIRM_ACTION) => {
            answer_callback(state, query, None).await;
            relay::handle_confirm(state, query).await
        }
        other => {
            debug!("Ignoring callback with data {other:?}");
            Ok(())
        }
    }
}

/// Telegram shows a client-side error on the button unless the callback is
/// answered within a bounded window. Failure here is logged, not propagated.
async fn answer_callback(state: &AppState, query: &CallbackQuery, text: Option<&str>) {
    let mut req = state.bot.answer_callback_query(query.id.clone());
    if let Some(text) = text {
        req.text = Some(text.to_string());
    }
    if let Err(e) = req.await {
        warn!("Failed to answer callback query: {e}");
    }
}

fn confirm_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "✅ Отправить заявку",
            CONFIRM_ACTION,
        )],
        vec![InlineKeyboardButton::callback(
            "✍️ Изменить тему (просто пришли новый текст)",
            CHANGE_TOPIC_ACTION,
        )],
    ])
}

/// Split `/cmd args`, dropping an optional `@botname` suffix on the command.
fn parse_command(text: &str) -> Option<(&str, &str)> {
    if !text.starts_with('/') {
        return None;
    }

    let text = text.trim();
    let mut parts = text.splitn(2, |c: char| c.is_whitespace());
    let cmd = parts.next()?.trim_start_matches('/');
    let args = parts.next().unwrap_or("").trim();

    let cmd = cmd.split('@').next()?;

    Some((cmd, args))
}
