//! # Domain Layer
//!
//! Pure catalog logic: the script codec, payload schema, key layout and
//! query predicates.
//!
//! ## Hexagonal Architecture
//!
//! This module contains NO I/O dependencies. Storage and time are reached
//! through the ports in the `ports` module.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod keys;
pub mod query;
pub mod validator;
pub mod value_objects;

pub use codec::{LockingScript, PushDataReader, ScriptChunk};
pub use entities::*;
pub use errors::*;
pub use query::ScanPlan;
pub use validator::PayloadValidator;
pub use value_objects::*;
