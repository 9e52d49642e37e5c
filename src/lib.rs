//! Lexigen — procedural generation of invented-language words and sentences.
//!
//! A grammar is a graph of named properties (terminal "root" categories and
//! composite "parent" categories) related by frequency-weighted composition
//! and ordering rules. Syntactic units bound to those properties are walked
//! at generation time to produce concrete symbol sequences.

pub mod core;
pub mod schema;
