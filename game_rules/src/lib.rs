//! # Game Rules
//!
//! The rules crate for NPC dialogue: characters, items, inventories, quests and
//! the transaction engine that moves gold and items between holders.
//! This crate owns game state only and does not contain any dialogue logic.

pub mod entities;
pub mod mechanics;
pub mod quests;
pub mod transaction;

pub use entities::*;
pub use mechanics::*;
pub use quests::*;
pub use transaction::*;
