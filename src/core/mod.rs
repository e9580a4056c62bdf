// Core engine exports
pub mod detector;
pub mod engine;
pub mod gate;
pub mod moderation;
pub mod recorder;
pub mod retry;
pub mod unmatch;

pub use detector::{initial_state, is_mutual, pair_matched};
pub use engine::{Engine, EngineLimits};
pub use gate::MessagingGate;
pub use moderation::ModerationService;
pub use recorder::InteractionRecorder;
pub use retry::RetryPolicy;
pub use unmatch::UnmatchHandler;
