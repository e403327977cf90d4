pub mod policy;
pub mod risk;

pub use policy::{PolicyDecision, PolicyEngine, PolicyVerdict};
pub use risk::RiskLevel;
