//! Core components of the adapter
//!
//! Leaves first: [`prefixer`], [`visibility`], [`attributes`]; then
//! [`listing`] and [`directory`], which talk to the backend through the
//! [`client`] trait. [`memory`] is an in-process backend.

pub mod attributes;
pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod listing;
pub mod memory;
pub mod options;
pub mod prefixer;
pub mod scope;
pub mod visibility;
