//! Database query functions organized by domain.

pub mod events;
pub mod livestock;
pub mod sandbox;
pub mod settings;
pub mod settlements;
pub mod splits;
pub mod wallets;
