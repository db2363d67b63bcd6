//! Shared constants for the dialogue engine.

use std::time::Duration;

/// Current version of the Duet server (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "duet";

/// Maximum length of each persona system prompt, in characters.
pub const MAX_SYSTEM_PROMPT_CHARS: usize = 375;

/// Number of paired rounds in the bounded conversation loop.
pub const MAX_ROUNDS: usize = 10;

/// Hard ceiling on generation calls per conversation:
/// 1 seed + 1 immediate reply + `MAX_ROUNDS` rounds of 2.
pub const MAX_GENERATION_CALLS: usize = 2 + 2 * MAX_ROUNDS;

/// Default sampling temperature per entity.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default nucleus-sampling top-p per entity.
pub const DEFAULT_TOP_P: f64 = 1.0;

/// Default response-length ceiling, in words, appended to each system prompt.
pub const DEFAULT_RESPONSE_LENGTH_WORDS: u32 = 35;

/// Token cap passed to the generation collaborator.
pub const MAX_COMPLETION_TOKENS: u32 = 250;

/// Extra time past the estimated playback duration before the artifact is
/// deleted by the deferred background task.
pub const ARTIFACT_CLEANUP_MARGIN: Duration = Duration::from_secs(5);

/// Extra time past the estimated playback duration the server waits for the
/// client's playback acknowledgment before proceeding anyway.
pub const PLAYBACK_ACK_MARGIN: Duration = Duration::from_secs(3);

/// Playback duration assumed when an artifact cannot be estimated.
pub const FALLBACK_PLAYBACK_SECS: f64 = 5.0;

/// Pause after each finished turn, giving the client a clean transition
/// boundary before the next `speaking` event.
pub const TURN_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Pause at the end of cleanup so a back-to-back `start` does not race the
/// filesystem and connection state cleanup just mutated.
pub const CLEANUP_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Conversational-style instructions appended to both persona prompts.
///
/// Shapes output register only; carries no control-flow meaning.
pub const CONVERSATION_STYLE_INSTRUCTIONS: &str = "\n\nCONVERSATION STYLE:\n\
- Engage naturally like a real human in casual conversation\n\
- React emotionally and personally to what the other person says\n\
- Use conversational flow: ask questions, make observations, share thoughts\n\
- Show curiosity, agreement, disagreement, surprise, or other natural reactions\n\
- Build on previous points rather than just stating new arguments\n\
- Use \"I think...\", \"That's interesting...\", \"Wait, but...\", \"You know what...\" etc.\n\
- Include conversational fillers and natural speech patterns\n\
- Show personality and individual perspective\n\
- Sometimes go off on tangents or bring up related points\n\
- React to the other person's tone and adjust accordingly\n\n\
AVOID:\n\
- Formal debate structure or academic presentations\n\
- Simply stating facts without personal reaction\n\
- Ignoring what the other person just said\n\
- Being overly polite or robotic\n\
- Starting every response the same way";
