//! Conversation orchestrator — the per-session turn-loop state machine.
//!
//! One orchestrator task per session drives the bounded sequence of
//! generation → synthesis → playback-wait steps: a seed utterance from
//! entity 1, an immediate reply from entity 2, then up to ten rounds of one
//! turn each. The hard ceiling is 22 generation calls regardless of stop
//! state, bounding unattended runaway sessions.
//!
//! Cancellation is cooperative: the token is checked at every suspension
//! point (generation, synthesis, the handshake wait, settle delays), so the
//! finalizer in [`ConversationOrchestrator::run`] — cleanup followed by
//! supervisor unregistration — runs on every terminal path.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use duet_core::constants::{
    ARTIFACT_CLEANUP_MARGIN, CONVERSATION_STYLE_INSTRUCTIONS, MAX_COMPLETION_TOKENS, MAX_ROUNDS,
    MAX_SYSTEM_PROMPT_CHARS, PLAYBACK_ACK_MARGIN, TURN_SETTLE_DELAY,
};
use duet_core::{Entity, ServerMessage, StartRequest};
use duet_llm::{ChatMessage, CompletionOptions, CompletionProvider};
use duet_tts::duration::estimate_playback_secs;
use duet_tts::ArtifactStore;

use crate::context::ConversationContext;
use crate::conversation::handshake::WaitOutcome;
use crate::websocket::connection::ClientConnection;

/// How a conversation ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// All rounds exhausted.
    Completed,
    /// A stop was observed at a checkpoint.
    Stopped,
    /// The task's cancellation token fired mid-step.
    Cancelled,
    /// Validation or configuration failure; the message goes to the client.
    Failed(String),
}

/// Marker for cancellation observed inside a step.
struct Cancelled;

/// Per-entity conversation parameters derived from the start request.
#[derive(Clone, Debug)]
pub struct EntityConfig {
    /// Raw prompt length in characters, validated against the cap.
    pub raw_prompt_chars: usize,
    /// Augmented system prompt actually sent to the generator.
    pub system_prompt: String,
    /// Voice key for synthesis.
    pub voice: String,
    /// Speech-rate multiplier.
    pub speed: f64,
    /// Sampling options.
    pub options: CompletionOptions,
}

/// Append the style block and word-cap line to a persona prompt.
fn augment_prompt(system: &str, response_length: u32) -> String {
    format!(
        "{system}{CONVERSATION_STYLE_INSTRUCTIONS}\n\nKeep your responses to {response_length} words maximum."
    )
}

/// Derive both entity configurations from a start request.
fn build_entity_configs(request: &StartRequest) -> (EntityConfig, EntityConfig) {
    let entity_a = EntityConfig {
        raw_prompt_chars: request.system1.chars().count(),
        system_prompt: augment_prompt(&request.system1, request.response_length1),
        voice: request.voice1.clone(),
        speed: request.speed1,
        options: CompletionOptions {
            temperature: request.temperature1,
            top_p: request.top_p1,
            max_tokens: MAX_COMPLETION_TOKENS,
        },
    };
    let entity_b = EntityConfig {
        raw_prompt_chars: request.system2.chars().count(),
        system_prompt: augment_prompt(&request.system2, request.response_length2),
        voice: request.voice2.clone(),
        speed: request.speed2,
        options: CompletionOptions {
            temperature: request.temperature2,
            top_p: request.top_p2,
            max_tokens: MAX_COMPLETION_TOKENS,
        },
    };
    (entity_a, entity_b)
}

/// Drives one conversation for one session.
pub struct ConversationOrchestrator {
    session_id: String,
    run_id: u64,
    token: CancellationToken,
    connection: Arc<ClientConnection>,
    ctx: Arc<ConversationContext>,
    entity_a: EntityConfig,
    entity_b: EntityConfig,
}

impl ConversationOrchestrator {
    /// Build an orchestrator for the connection's session.
    #[must_use]
    pub fn new(
        ctx: Arc<ConversationContext>,
        connection: Arc<ClientConnection>,
        request: &StartRequest,
        token: CancellationToken,
        run_id: u64,
    ) -> Self {
        let session_id = connection.session_id().to_owned();
        let (entity_a, entity_b) = build_entity_configs(request);
        Self {
            session_id,
            run_id,
            token,
            connection,
            ctx,
            entity_a,
            entity_b,
        }
    }

    /// Run the conversation to a terminal state, then tear down.
    ///
    /// Cleanup and supervisor unregistration always run, whichever path the
    /// state machine took.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn run(self) {
        let outcome = self.drive().await;
        match &outcome {
            RunOutcome::Completed => info!("conversation completed"),
            RunOutcome::Stopped => info!("conversation stopped"),
            RunOutcome::Cancelled => debug!("conversation cancelled"),
            RunOutcome::Failed(message) => {
                warn!(message, "conversation failed");
                let _ = self
                    .connection
                    .send_message(&ServerMessage::error(message.clone()));
            }
        }

        self.ctx.cleanup.run(&self.session_id).await;
        self.ctx.supervisor.unregister(&self.session_id, self.run_id);
    }

    /// The turn-loop state machine proper.
    async fn drive(&self) -> RunOutcome {
        let id = &self.session_id;

        // Init: validate before any session state exists
        if self.entity_a.raw_prompt_chars > MAX_SYSTEM_PROMPT_CHARS {
            return RunOutcome::Failed(format!(
                "System prompt 1 exceeds {MAX_SYSTEM_PROMPT_CHARS} character limit"
            ));
        }
        if self.entity_b.raw_prompt_chars > MAX_SYSTEM_PROMPT_CHARS {
            return RunOutcome::Failed(format!(
                "System prompt 2 exceeds {MAX_SYSTEM_PROMPT_CHARS} character limit"
            ));
        }
        let Some(provider) = self.ctx.provider.clone() else {
            return RunOutcome::Failed("Azure OpenAI credentials not found".to_owned());
        };

        if let Err(e) = self.ctx.registry.create(id) {
            // The start path cleans up before launching; hitting this means
            // a prior session's teardown did not finish.
            return RunOutcome::Failed(e.to_string());
        }
        self.ctx.handshake.prepare(id);
        self.ctx.synthesizer.reset_stop();

        // Seed: entity A opens from a synthetic user turn
        if self.ctx.registry.is_stopped(id) {
            return RunOutcome::Stopped;
        }
        let opener = format!(
            "Make a first response based on your system prompt: {}",
            self.entity_a.system_prompt
        );
        let seed_history = [ChatMessage::user(opener)];
        let Ok(seed) = self.generate(&provider, Entity::A, &seed_history).await else {
            return RunOutcome::Cancelled;
        };
        if let Some(text) = seed {
            self.ctx.registry.push_turn(id, Entity::A, &text);
            if self.speak_and_wait(Entity::A, &text).await.is_err() {
                return RunOutcome::Cancelled;
            }
        }

        if self.ctx.registry.is_stopped(id) {
            return RunOutcome::Stopped;
        }

        // Immediate reply from entity B
        let history = self.ctx.registry.history_for(id, Entity::B);
        let Ok(reply) = self.generate(&provider, Entity::B, &history).await else {
            return RunOutcome::Cancelled;
        };
        if let Some(text) = reply {
            self.ctx.registry.push_turn(id, Entity::B, &text);
            if self.speak_and_wait(Entity::B, &text).await.is_err() {
                return RunOutcome::Cancelled;
            }
        }

        // Bounded loop: one turn per entity per round
        for round in 0..MAX_ROUNDS {
            for entity in [Entity::A, Entity::B] {
                if self.ctx.registry.is_stopped(id) {
                    return RunOutcome::Stopped;
                }
                let history = self.ctx.registry.history_for(id, entity);
                let Ok(generated) = self.generate(&provider, entity, &history).await else {
                    return RunOutcome::Cancelled;
                };
                if let Some(text) = generated {
                    self.ctx.registry.push_turn(id, entity, &text);
                    if self.speak_and_wait(entity, &text).await.is_err() {
                        return RunOutcome::Cancelled;
                    }
                }
            }
            debug!(round, "round finished");
        }

        RunOutcome::Completed
    }

    fn config_for(&self, entity: Entity) -> &EntityConfig {
        match entity {
            Entity::A => &self.entity_a,
            Entity::B => &self.entity_b,
        }
    }

    /// One generation call, cancellable, with failure absorbed.
    ///
    /// `Ok(None)` is a tolerated generation failure: the turn is skipped and
    /// the loop continues. No `speaking` event is emitted for a silent turn.
    async fn generate(
        &self,
        provider: &Arc<dyn CompletionProvider>,
        entity: Entity,
        history: &[ChatMessage],
    ) -> Result<Option<String>, Cancelled> {
        let config = self.config_for(entity);
        tokio::select! {
            () = self.token.cancelled() => Err(Cancelled),
            result = provider.complete(&config.system_prompt, history, &config.options) => {
                match result {
                    Ok(text) => Ok(Some(text)),
                    Err(e) => {
                        warn!(
                            entity = entity.index(),
                            category = e.category(),
                            error = %e,
                            "generation failed, skipping turn"
                        );
                        Ok(None)
                    }
                }
            }
        }
    }

    /// The speak-and-wait procedure shared by every turn.
    ///
    /// Synthesizes the utterance, emits `speaking`, schedules deferred
    /// artifact deletion, waits for the client's playback ack (timeout is
    /// the designed fallback), then emits `finished_speaking` and holds the
    /// settle delay. Stop is re-checked around every blocking step;
    /// cancellation deletes the artifact and propagates.
    async fn speak_and_wait(&self, entity: Entity, text: &str) -> Result<(), Cancelled> {
        let id = &self.session_id;
        let config = self.config_for(entity);

        if self.ctx.registry.is_stopped(id) {
            return Ok(());
        }

        let artifact = tokio::select! {
            () = self.token.cancelled() => return Err(Cancelled),
            result = self.ctx.synthesizer.synthesize(text, &config.voice, config.speed) => {
                match result {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!(entity = entity.index(), error = %e, "synthesis failed, speaking without audio");
                        None
                    }
                }
            }
        };

        // Stopped while synthesis was in flight: the artifact is orphaned
        if self.ctx.registry.is_stopped(id) {
            if let Some(path) = &artifact {
                let _ = self.ctx.store.remove(path);
            }
            return Ok(());
        }

        let audio_url = artifact
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| format!("/audio/{n}"));
        self.send_if_active(&ServerMessage::Speaking {
            entity: entity.index(),
            audio_url,
            text: text.to_owned(),
        });

        if let Some(path) = &artifact {
            let playback = Duration::from_secs_f64(estimate_playback_secs(path));
            let _ = ArtifactStore::schedule_removal(path.clone(), playback + ARTIFACT_CLEANUP_MARGIN);

            let outcome = tokio::select! {
                () = self.token.cancelled() => {
                    let _ = self.ctx.store.remove(path);
                    return Err(Cancelled);
                }
                outcome = self
                    .ctx
                    .handshake
                    .await_confirmation(id, playback + PLAYBACK_ACK_MARGIN) => outcome,
            };
            match outcome {
                WaitOutcome::Confirmed | WaitOutcome::TimedOut => {}
                // Teardown released the wait: emit nothing further
                WaitOutcome::Released => return Ok(()),
            }
        }

        if !self.ctx.registry.is_stopped(id) {
            self.send_if_active(&ServerMessage::FinishedSpeaking);
        }

        tokio::select! {
            () = self.token.cancelled() => Err(Cancelled),
            () = tokio::time::sleep(TURN_SETTLE_DELAY) => Ok(()),
        }
    }

    /// Send an event unless the session has been stopped or torn down.
    fn send_if_active(&self, message: &ServerMessage) {
        if !self.ctx.registry.is_stopped(&self.session_id) {
            let _ = self.connection.send_message(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system1: &str, system2: &str) -> StartRequest {
        serde_json::from_value(serde_json::json!({
            "system1": system1,
            "system2": system2,
        }))
        .unwrap()
    }

    #[test]
    fn augmented_prompt_keeps_persona_and_adds_style() {
        let prompt = augment_prompt("You are a pirate.", 20);
        assert!(prompt.starts_with("You are a pirate."));
        assert!(prompt.contains("CONVERSATION STYLE:"));
        assert!(prompt.ends_with("Keep your responses to 20 words maximum."));
    }

    #[test]
    fn entity_configs_derive_from_request() {
        let req: StartRequest = serde_json::from_value(serde_json::json!({
            "system1": "one",
            "system2": "two",
            "voice1": "Christopher",
            "speed2": 1.5,
            "temperature2": 0.2,
            "topP1": 0.9,
            "responseLength2": 12
        }))
        .unwrap();
        let (a, b) = build_entity_configs(&req);

        assert_eq!(a.raw_prompt_chars, 3);
        assert_eq!(a.voice, "Christopher");
        assert!((a.options.top_p - 0.9).abs() < f64::EPSILON);
        assert_eq!(a.options.max_tokens, 250);

        assert_eq!(b.voice, "Ava");
        assert!((b.speed - 1.5).abs() < f64::EPSILON);
        assert!((b.options.temperature - 0.2).abs() < f64::EPSILON);
        assert!(b.system_prompt.contains("12 words maximum"));
    }

    #[test]
    fn raw_length_counts_chars_not_augmentation() {
        let long = "x".repeat(375);
        let (a, _) = build_entity_configs(&request(&long, "short"));
        // The augmented prompt is far longer, but validation uses raw length
        assert_eq!(a.raw_prompt_chars, 375);
        assert!(a.system_prompt.len() > 375);
    }
}
