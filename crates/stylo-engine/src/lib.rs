pub mod codec;
pub mod config;
pub mod gemini;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod slot;

#[cfg(test)]
mod test_support;

pub use config::StudioConfig;
pub use gemini::{EditRequest, GeneratedImage, GenerationClient, GenerationTransport, HttpTransport};
pub use session::{GenerationOutcome, Session, SessionState};
pub use slot::{OperationSlot, SlotGuard};
