#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod scheduler;
pub mod security;
pub mod skills;
pub mod store;
pub mod tools;
pub mod utils;

pub use agent::{Orchestrator, TurnOutcome};
pub use config::Config;
pub use error::{ForgeError, ForgeResult};
pub use scheduler::Scheduler;
pub use store::Store;
