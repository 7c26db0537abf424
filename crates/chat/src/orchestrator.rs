//! Drives chat sessions: prompts, job submission and delivery of the result.

use std::sync::Arc;

use {
    async_trait::async_trait,
    mediaferry_channels::{
        ChannelEventSink, ChannelOutbound, Choice, InboundEvent, MediaKind, MessageRef,
    },
    mediaferry_media::{JobSpecification, TargetFormat},
    mediaferry_sessions::{SessionStore, Transition},
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
    uuid::Uuid,
};

use crate::{
    Error, Result,
    client::{ConversionClient, Converted},
    prompts,
};

#[derive(Clone)]
pub struct Orchestrator {
    sessions: Arc<SessionStore>,
    client: Arc<dyn ConversionClient>,
    outbound: Arc<dyn ChannelOutbound>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn ConversionClient>, outbound: Arc<dyn ChannelOutbound>) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            client,
            outbound,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Apply one inbound event. Submissions run on their own task, whose
    /// handle is returned so callers (and tests) can await it.
    pub async fn handle_event(&self, event: InboundEvent) -> Option<JoinHandle<()>> {
        let chat_id = event.chat_id;
        match self.sessions.apply(&chat_id, &event.event) {
            Transition::PromptUrl => {
                self.send(&chat_id, prompts::START_PROMPT, &[]).await;
            },
            Transition::PromptFormat => {
                self.send(&chat_id, prompts::FORMAT_PROMPT, &prompts::format_choices())
                    .await;
            },
            Transition::PromptQuality(format) => {
                self.send(
                    &chat_id,
                    &prompts::quality_prompt(format),
                    &prompts::quality_choices(format),
                )
                .await;
            },
            Transition::Rejected { reason } => {
                self.send(&chat_id, &prompts::conversion_error(&reason), &[])
                    .await;
            },
            Transition::Submit { spec, generation } => {
                let this = self.clone();
                return Some(tokio::spawn(async move {
                    this.process(chat_id, spec, generation).await;
                }));
            },
            Transition::Ignored => {},
        }
        None
    }

    async fn send(&self, chat_id: &str, text: &str, choices: &[Choice]) {
        if let Err(e) = self.outbound.send_text(chat_id, text, choices).await {
            warn!(chat_id, error = %e, "failed to send message");
        }
    }

    async fn edit(&self, chat_id: &str, message: MessageRef, text: &str) {
        if let Err(e) = self.outbound.edit_text(chat_id, message, text).await {
            warn!(chat_id, error = %e, "failed to edit message");
        }
    }

    /// Run one job to completion, then drop the session that started it.
    async fn process(&self, chat_id: String, spec: JobSpecification, generation: Uuid) {
        info!(
            %chat_id,
            format = %spec.target_format(),
            quality = ?spec.quality_hint(),
            "processing chat request"
        );
        match self.relay(&chat_id, &spec).await {
            Ok(()) => info!(%chat_id, "chat request completed"),
            Err(e) => warn!(%chat_id, error = %e, "chat request failed"),
        }
        if !self.sessions.remove_if(&chat_id, generation) {
            debug!(%chat_id, "session restarted while processing, keeping the new one");
        }
    }

    async fn relay(&self, chat_id: &str, spec: &JobSpecification) -> Result<()> {
        let notice = self
            .outbound
            .send_text(chat_id, prompts::PLEASE_WAIT, &[])
            .await?;

        let converted = match self.client.convert(spec).await {
            Ok(converted) => converted,
            Err(e) => {
                self.edit(chat_id, notice, &prompts::conversion_error(&e.to_string()))
                    .await;
                return Err(e);
            },
        };

        self.edit(chat_id, notice, prompts::UPLOADING).await;

        match self.transfer(chat_id, spec.target_format(), &converted).await {
            Ok(()) => {
                self.edit(chat_id, notice, prompts::DONE).await;
                Ok(())
            },
            Err(e) => {
                self.edit(chat_id, notice, &prompts::transfer_error(&e.to_string()))
                    .await;
                Err(Error::transfer_failed(e))
            },
        }
    }

    /// Fetch the artifact into a private temporary file and upload it.
    /// The file is removed when this returns, whatever the outcome.
    async fn transfer(
        &self,
        chat_id: &str,
        format: TargetFormat,
        converted: &Converted,
    ) -> Result<()> {
        let scratch = tempfile::Builder::new()
            .prefix("mediaferry-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()?;

        let bytes = self
            .client
            .download(&converted.file_path, scratch.path())
            .await?;
        debug!(chat_id, bytes, path = %scratch.path().display(), "uploading artifact");

        self.outbound
            .send_media(chat_id, media_kind(format), scratch.path())
            .await?;
        Ok(())
    }
}

fn media_kind(format: TargetFormat) -> MediaKind {
    match format {
        TargetFormat::Video => MediaKind::Video,
        TargetFormat::Audio => MediaKind::Audio,
        TargetFormat::Image => MediaKind::Photo,
    }
}

#[async_trait]
impl ChannelEventSink for Orchestrator {
    async fn dispatch(&self, event: InboundEvent) {
        // Submissions detach; the polling loop moves on immediately.
        let _ = self.handle_event(event).await;
    }
}
