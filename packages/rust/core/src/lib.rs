//! Domain logic for Firestore export tooling.
//!
//! Assembles decoded records into collections, drives the conversion
//! pipeline, and answers read-only queries over a converted export
//! (interactive viewing and CSV projection).

pub mod assembler;
pub mod pipeline;
pub mod projection;
pub mod query;
