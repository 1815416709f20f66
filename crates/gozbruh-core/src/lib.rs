//! # gozbruh Core
//!
//! Pure primitives for moving meshes between a modeling host and a
//! sculpting host without losing track of which object is which.
//!
//! This crate contains no I/O, no host access, no networking. It is pure
//! computation over names, identifiers and manifests.
//!
//! ## Key Types
//!
//! - [`ObjectName`] - A validated in-host object name (also the artifact base name)
//! - [`DurableId`] - The cross-session identifier stored on a mesh as an attribute
//! - [`TransferManifest`] - The ordered batch of objects sent in one exchange
//! - [`Conflict`] - A mismatch between an object's name and its stored ID
//! - [`ReadySet`] - The batch of objects cleared for transfer
//!
//! ## Identity
//!
//! An object's [`DurableId`] is assigned at first export and equals the
//! name the object had at that moment. Later drift between the two is
//! classified by [`classify`] and resolved by a [`UserChoice`].

pub mod conflict;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod types;
pub mod validation;

pub use conflict::{Conflict, ReadySet, UserChoice};
pub use error::{CoreError, Result};
pub use identity::{classify, IdentityStatus};
pub use manifest::{ManifestEntry, ObjData, TransferManifest};
pub use types::{DurableId, ObjectName, DURABLE_ID_ATTR, PARENT_ATTR};
pub use validation::{artifact_file_name, split_file_name, validate_object_name};
