use std::{future::Future, path::Path, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        ApiError, RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId},
    },
    tracing::{debug, warn},
};

use mediaferry_channels::{ChannelOutbound, Choice, Error, MediaKind, MessageRef, Result};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Outbound message sender for Telegram.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        to: &str,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = to,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = to,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

fn parse_chat_id(to: &str) -> Result<ChatId> {
    to.parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::unknown_recipient(to, "not a telegram chat id"))
}

/// All choices on one row, in order.
fn inline_keyboard(choices: &[Choice]) -> Option<InlineKeyboardMarkup> {
    if choices.is_empty() {
        return None;
    }
    let row = choices
        .iter()
        .map(|c| InlineKeyboardButton::callback(c.label.clone(), c.data.clone()))
        .collect::<Vec<_>>();
    Some(InlineKeyboardMarkup::new(vec![row]))
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn is_message_not_modified_error(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}

#[async_trait]
impl ChannelOutbound for TelegramOutbound {
    async fn send_text(&self, to: &str, text: &str, choices: &[Choice]) -> Result<MessageRef> {
        let chat_id = parse_chat_id(to)?;
        let keyboard = inline_keyboard(choices);
        let message = self
            .run_telegram_request_with_retry(to, "send message", || {
                let mut req = self.bot.send_message(chat_id, text);
                if let Some(ref keyboard) = keyboard {
                    req = req.reply_markup(keyboard.clone());
                }
                async move { req.await }
            })
            .await
            .map_err(|e| Error::message("send telegram message", e))?;
        Ok(MessageRef {
            message_id: message.id.0,
        })
    }

    async fn edit_text(&self, to: &str, message: MessageRef, text: &str) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        let result = self
            .run_telegram_request_with_retry(to, "edit message", || {
                let req = self
                    .bot
                    .edit_message_text(chat_id, MessageId(message.message_id), text);
                async move { req.await }
            })
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_message_not_modified_error(&e) => {
                debug!(chat_id = to, "telegram edit skipped: message not modified");
                Ok(())
            },
            Err(e) => Err(Error::message("edit telegram message", e)),
        }
    }

    async fn send_media(&self, to: &str, kind: MediaKind, path: &Path) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        let result = match kind {
            MediaKind::Photo => self
                .run_telegram_request_with_retry(to, "send photo", || {
                    let req = self.bot.send_photo(chat_id, InputFile::file(path));
                    async move { req.await }
                })
                .await
                .map(drop),
            MediaKind::Audio => self
                .run_telegram_request_with_retry(to, "send audio", || {
                    let req = self.bot.send_audio(chat_id, InputFile::file(path));
                    async move { req.await }
                })
                .await
                .map(drop),
            MediaKind::Video => self
                .run_telegram_request_with_retry(to, "send video", || {
                    let req = self.bot.send_video(chat_id, InputFile::file(path));
                    async move { req.await }
                })
                .await
                .map(drop),
        };
        result.map_err(|e| Error::upload(path, e))
    }
}
