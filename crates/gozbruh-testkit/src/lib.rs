//! # gozbruh Testkit
//!
//! Testing utilities for gozbruh.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: exact wire bytes for every frame kind
//! - **Generators**: Proptest strategies for names and manifests
//! - **Fixtures**: a scripted presenter and both sides of a bridge on
//!   loopback
//!
//! ## Golden Vectors
//!
//! ```rust
//! use gozbruh_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! assert!(!all_vectors().is_empty());
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use gozbruh_testkit::generators::manifest;
//!
//! proptest! {
//!     #[test]
//!     fn manifests_validate(m in manifest()) {
//!         prop_assert!(m.validate().is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use gozbruh_testkit::BridgeFixture;
//!
//! async fn example() {
//!     let fixture = BridgeFixture::start([]).await.unwrap();
//!     fixture.select_new(&["Sphere1"]).unwrap();
//!
//!     let conn = fixture.bridge.connect_to_sculpt();
//!     fixture.mesh_sender().send(&conn).await.unwrap();
//!     fixture.shutdown().await;
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{BridgeFixture, ScriptedPresenter};
pub use generators::{manifest_from_params, ManifestParams};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
