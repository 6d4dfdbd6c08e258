//! Botcast Core Library
//!
//! Turn orchestration for an autonomous multi-character podcast: speaker selection,
//! topic scheduling, paid injections and fan-out of synthesized audio to viewers.

pub mod broadcast;
pub mod characters;
pub mod orchestrator;
pub mod providers;
pub mod telemetry;
