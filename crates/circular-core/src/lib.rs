//! Core types and trait definitions for the circular consent workflow.
//!
//! Storage backends, the participant directory and the document renderer are
//! reached only through the traits in [`store`], [`directory`] and
//! [`document`].

pub mod activity;
pub mod answer;
pub mod attendance;
pub mod auth;
pub mod definition;
pub mod directory;
pub mod document;
pub mod error;
pub mod health;
pub mod response;
pub mod signature;
pub mod store;

pub use error::{Error, Result};
