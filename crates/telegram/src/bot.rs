use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {mediaferry_channels::ChannelEventSink, mediaferry_config::TelegramConfig};

use crate::handlers;

/// Pause after a failed `getUpdates` before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Build a bot whose HTTP client outlives the long-poll timeout, so the
/// client doesn't abort `getUpdates` before Telegram responds.
pub fn build_bot(config: &TelegramConfig) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs) + 15))
        .build()?;
    Ok(Bot::with_client(config.token.expose_secret(), client))
}

/// Verify credentials, clear any webhook and register `/start`.
pub async fn connect(bot: &Bot) -> anyhow::Result<Option<String>> {
    let me = bot.get_me().await?;
    let username = me.username.clone();

    // Long polling does not work while a webhook is set.
    bot.delete_webhook().send().await?;

    let commands = vec![BotCommand::new("start", "Start a new download")];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?username, "telegram bot connected (webhook cleared)");
    Ok(username)
}

/// Poll for updates until `cancel` fires or another poller takes over.
///
/// Updates are handed to `sink` one at a time, in order.
pub fn start_polling(
    bot: Bot,
    sink: Arc<dyn ChannelEventSink>,
    poll_timeout_secs: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting telegram manual polling loop");
        let mut offset: i32 = 0;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("telegram polling stopped");
                    break;
                },
                result = bot
                    .get_updates()
                    .offset(offset)
                    .timeout(poll_timeout_secs)
                    .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
                    .send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match update.kind {
                            UpdateKind::Message(msg) => {
                                debug!(chat_id = msg.chat.id.0, "received telegram message");
                                handlers::handle_message(&msg, sink.as_ref()).await;
                            },
                            UpdateKind::CallbackQuery(query) => {
                                debug!(
                                    callback_data = ?query.data,
                                    "received telegram callback query"
                                );
                                handlers::handle_callback_query(&query, &bot, sink.as_ref())
                                    .await;
                            },
                            other => {
                                debug!("ignoring non-message update: {other:?}");
                            },
                        }
                    }
                },
                Err(e) => {
                    // Another instance is polling with the same token.
                    if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        warn!(
                            "telegram polling disabled: another instance is already running with this token"
                        );
                        cancel.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                    }
                },
            }
        }
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        axum::{Json, Router, extract::State, http::Uri, routing::post},
        mediaferry_channels::{ChatEvent, InboundEvent},
        serde_json::{Value, json},
        std::sync::Mutex,
    };

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<InboundEvent>>,
    }

    #[async_trait]
    impl ChannelEventSink for RecordingSink {
        async fn dispatch(&self, event: InboundEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[derive(Clone, Default)]
    struct MockTelegramApi {
        get_updates_calls: Arc<Mutex<usize>>,
        methods: Arc<Mutex<Vec<String>>>,
    }

    async fn telegram_api_handler(State(state): State<MockTelegramApi>, uri: Uri) -> Json<Value> {
        let method = uri.path().rsplit('/').next().unwrap_or_default().to_string();
        state.methods.lock().unwrap().push(method.clone());
        if method != "GetUpdates" {
            return Json(json!({ "ok": true, "result": true }));
        }

        let call = {
            let mut calls = state.get_updates_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        match call {
            1 => Json(json!({
                "ok": true,
                "result": [
                    {
                        "update_id": 10,
                        "message": {
                            "message_id": 1,
                            "date": 1,
                            "chat": { "id": 42, "type": "private", "first_name": "Alice" },
                            "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
                            "text": "/start"
                        }
                    },
                    {
                        "update_id": 11,
                        "callback_query": {
                            "id": "cb-1",
                            "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
                            "chat_instance": "ci",
                            "data": "format_mp4",
                            "message": {
                                "message_id": 2,
                                "date": 1,
                                "chat": { "id": 42, "type": "private", "first_name": "Alice" },
                                "text": "Choose format:"
                            }
                        }
                    }
                ]
            })),
            _ => Json(json!({
                "ok": false,
                "error_code": 409,
                "description": "Conflict: terminated by other getUpdates request; make sure that only one bot instance is running"
            })),
        }
    }

    #[tokio::test]
    async fn polling_dispatches_updates_and_stops_on_conflict() {
        let api = MockTelegramApi::default();
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(api.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock telegram api");
        });

        let api_url = reqwest::Url::parse(&format!("http://{addr}/")).expect("parse api url");
        let bot = Bot::new("test-token").set_api_url(api_url);
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();

        let handle = start_polling(
            bot,
            Arc::clone(&sink) as Arc<dyn ChannelEventSink>,
            0,
            cancel.clone(),
        );
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("polling loop should stop on conflict")
            .unwrap();

        assert!(cancel.is_cancelled());
        let events = sink.events.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].chat_id, "42");
        assert_eq!(events[0].event, ChatEvent::Start);
        assert_eq!(events[1].event, ChatEvent::Selection("format_mp4".into()));
        assert!(
            api.methods
                .lock()
                .unwrap()
                .iter()
                .any(|m| m == "AnswerCallbackQuery")
        );
    }

    #[tokio::test]
    async fn cancelled_polling_exits() {
        // Nothing listens here; the loop must still honor cancellation.
        let bot = Bot::new("test-token")
            .set_api_url(reqwest::Url::parse("http://127.0.0.1:9/").unwrap());
        let cancel = CancellationToken::new();
        let handle = start_polling(
            bot,
            Arc::new(RecordingSink::default()),
            0,
            cancel.clone(),
        );
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("polling loop should exit after cancel")
            .unwrap();
    }
}
