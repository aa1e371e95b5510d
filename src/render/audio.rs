use crate::{assets::decode::PreparedAudio, foundation::error::CuecastResult};

/// Output for audio cues. Playback is fire-and-forget: the sequencer never waits on a cue and
/// only logs an error.
pub trait AudioSink: Send + Sync {
    fn play_cue(&self, key: &str, audio: &PreparedAudio) -> CuecastResult<()>;
}

/// Sink that discards every cue, for hosts without audio.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn play_cue(&self, _key: &str, _audio: &PreparedAudio) -> CuecastResult<()> {
        Ok(())
    }
}
