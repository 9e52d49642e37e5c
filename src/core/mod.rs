pub mod builder;
pub mod engine;
pub mod generator;
pub mod grammar;
pub mod property;
pub mod registry;
pub mod selector;
pub mod unit;
