//! Voice-key table mapping display names to Azure neural voice identifiers.

/// Azure voice used when a key is unknown (the entity-1 default).
pub const DEFAULT_VOICE: &str = "en-US-ChristopherMultilingualNeural";

/// Resolve a voice key to an Azure neural voice name.
///
/// Unknown keys fall back to [`DEFAULT_VOICE`]. The `en_*` entries are
/// legacy aliases kept for old clients.
#[must_use]
pub fn azure_voice_name(key: &str) -> &'static str {
    match key {
        // Entity defaults
        "entity1" => "en-US-ChristopherMultilingualNeural",
        "entity2" => "en-US-CoraMultilingualNeural",
        // All available Azure voices
        "Adam" => "en-US-AdamMultilingualNeural",
        "Alloy" => "en-US-AlloyTurboMultilingualNeural",
        "Amanda" => "en-US-AmandaMultilingualNeural",
        "Andrew" => "en-US-AndrewMultilingualNeural",
        "Ava" => "en-US-AvaMultilingualNeural",
        "Brandon" => "en-US-BrandonMultilingualNeural",
        "Brian" => "en-US-BrianMultilingualNeural",
        "Christopher" => "en-US-ChristopherMultilingualNeural",
        "Cora" => "en-US-CoraMultilingualNeural",
        "Davis" => "en-US-DavisMultilingualNeural",
        "Derek" => "en-US-DerekMultilingualNeural",
        "Dustin" => "en-US-DustinMultilingualNeural",
        "Echo" => "en-US-EchoTurboMultilingualNeural",
        "Emma" => "en-US-EmmaMultilingualNeural",
        "Evelyn" => "en-US-EvelynMultilingualNeural",
        "Fable" => "en-US-FableTurboMultilingualNeural",
        "Jenny" => "en-US-JennyMultilingualNeural",
        "Lewis" => "en-US-LewisMultilingualNeural",
        "Lola" => "en-US-LolaMultilingualNeural",
        "Nancy" => "en-US-NancyMultilingualNeural",
        "Nova" => "en-US-NovaTurboMultilingualNeural",
        "Onyx" => "en-US-OnyxTurboMultilingualNeural",
        "Phoebe" => "en-US-PhoebeMultilingualNeural",
        "Ryan" => "en-US-RyanMultilingualNeural",
        "Samuel" => "en-US-SamuelMultilingualNeural",
        "Serena" => "en-US-SerenaMultilingualNeural",
        "Shimmer" => "en-US-ShimmerTurboMultilingualNeural",
        "Steffan" => "en-US-SteffanMultilingualNeural",
        // Legacy aliases
        "en_amy_med" => "en-US-AvaMultilingualNeural",
        "en_bryce_med" => "en-US-BrianMultilingualNeural",
        _ => DEFAULT_VOICE,
    }
}
