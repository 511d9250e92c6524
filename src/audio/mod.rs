pub mod capture;
pub mod decoder;

pub use capture::MicrophoneCapture;
pub use decoder::{decode, DecodedAudio};
