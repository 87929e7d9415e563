//! Stage module providing concurrent access to stages through actors.
//!
//! This module implements:
//! - StageActor: the single writer of one stage
//! - BracketManager: spawns actors and routes requests to them
//! - Message-based mutation with tokio channels
//!
//! ## Architecture
//!
//! Each stage runs in its own Tokio task with an mpsc inbox, so reports and
//! resets on one stage are applied strictly one at a time. After every commit
//! the actor publishes an immutable `Arc<Bracket>` through a watch channel;
//! readers clone the latest snapshot and never observe a half-applied report.
//!
//! ## Example
//!
//! ```
//! use brackets::bracket::{MatchUpdate, StageFormat};
//! use brackets::events::NoopEventSink;
//! use brackets::stage::{BracketManager, CreateBracket, ManagerConfig};
//! use brackets::store::InMemoryBracketRepository;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = BracketManager::new(
//!         Arc::new(InMemoryBracketRepository::new()),
//!         Arc::new(NoopEventSink),
//!         ManagerConfig::default(),
//!     );
//!
//!     let request = CreateBracket::new("Final", StageFormat::SingleElimination, &["A", "B"]);
//!     let stage = manager.create_bracket(request).await.unwrap();
//!     manager
//!         .report_result(stage.id, 0, MatchUpdate::scores(2, 0))
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;

pub use actor::{StageActor, StageHandle};
pub use config::ManagerConfig;
pub use manager::{BracketManager, CreateBracket};
pub use messages::StageMessage;
