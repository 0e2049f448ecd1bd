//! # VC Test Utilities
//!
//! Shared test utilities for the voice lifecycle service.
//!
//! This crate provides in-memory collaborators and fixtures so the
//! lifecycle engine can be driven end to end without a gateway
//! connection or a database.
//!
//! ## Modules
//!
//! - `mock_platform` - In-memory rooms, members, notices and moves
//! - `mock_history` - Session history that records into a `Vec`
//! - `fixtures` - Ids, members, timestamps and a wired-up [`TestHarness`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vc_test_utils::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let harness = TestHarness::new();
//!     harness.platform.add_room(ROOM_A, "alice\u{306E}VC", Some(CATEGORY));
//!
//!     let alice = member(1, "alice");
//!     harness.join(&alice, ROOM_A, t(0)).await;
//!     harness.leave(&alice, t(60)).await;
//!
//!     assert_eq!(harness.history.records().len(), 1);
//! }
//! ```

pub mod fixtures;
pub mod mock_history;
pub mod mock_platform;

pub use fixtures::*;
pub use mock_history::*;
pub use mock_platform::*;
