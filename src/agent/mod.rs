pub mod conversation;
pub mod orchestrator;
pub mod outcome;

pub use conversation::ConversationWindow;
pub use orchestrator::{Orchestrator, TurnHandler};
pub use outcome::{ApprovalOutcome, Channel, FailureKind, TurnOutcome};
