pub mod audio;
pub mod device;
pub mod wav;

pub use audio::{rms, SPEECH_PCM_SAMPLE_RATE};
pub use wav::{decode_wav, DecodedAudio};
