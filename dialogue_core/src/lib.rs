//! # Dialogue Core
//!
//! The "brain" of a conversational NPC. This crate interfaces with
//! `game_rules`, gates what an NPC may say and do by its emotional state, and
//! drives each player utterance through a detect, reflect, act, transition
//! pipeline.
//!
//! ## Core Components
//!
//! - **machine**: State machine with an explicit `(state, condition) -> state` trigger table
//! - **knowledge**: Quests, secrets and facts, and the gate filtering them per state
//! - **classifier** / **reflection**: Contracts for intent detection and approval
//! - **executor**: Confirmation-gated actions, outcome rules and transactions
//! - **trade**: Buy/sell sub-negotiation
//! - **response**: Prompt assembly for the NPC's spoken answer
//! - **npc**: The per-NPC turn pipeline
//! - **config**: TOML NPC definitions, including the bundled merchant preset
//!
//! ## Design Philosophy
//!
//! - **State-Gated**: An NPC never reveals knowledge or performs actions its current state does not allow
//! - **Collaborator-Driven**: Language understanding and generation are pluggable; the core decides
//! - **Fail-Soft**: Runtime failures degrade to a no-op with an explanation, never a panic

pub mod classifier;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod executor;
pub mod knowledge;
pub mod machine;
pub mod memory;
pub mod npc;
pub mod reflection;
pub mod response;
pub mod trade;

pub use classifier::*;
pub use config::*;
pub use confirmation::*;
pub use error::*;
pub use executor::*;
pub use knowledge::*;
pub use machine::*;
pub use memory::*;
pub use npc::*;
pub use reflection::*;
pub use response::*;
pub use trade::*;
