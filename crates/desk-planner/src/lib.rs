//! Multi-step planner streams for tradedesk
//!
//! The backend planner reports its progress as a stream of `step` events
//! followed by one `final` (or `error`) event. [`PlanStreamConsumer`] opens
//! that stream through a [`PlanTransport`], folds the events into the current
//! [`PlanRun`] and publishes every change on a watch channel.
//!
//! Only one run is current per consumer. Starting another plan aborts the
//! stream of the previous run before the new one is opened, and a generation
//! tag keeps any straggling event of an older run out of the new transcript.
//!
//! # Example
//!
//! ```rust,ignore
//! use desk_planner::{HttpPlanTransport, PlanRequest, PlanStreamConsumer};
//! use desk_utils::DeskConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DeskConfig::default();
//!     let consumer = PlanStreamConsumer::new(Arc::new(HttpPlanTransport::from_config(&config)?));
//!
//!     let request = PlanRequest::new("Should I add to my ETH position?").with_config(&config);
//!     let run = consumer.start_plan(request).await?.finished().await;
//!     println!("{:?}: {:?}", run.status, run.final_answer);
//!     Ok(())
//! }
//! ```

pub mod consumer;
pub mod decode;
pub mod error;
pub mod event;
pub mod transport;
pub mod types;

pub use consumer::{PlanHandle, PlanStreamConsumer};
pub use decode::{JsonLinesDecoder, SseDecoder};
pub use error::{PlanError, Result};
pub use event::{CandidateTool, PlanEvent, PlanStep};
pub use transport::{HttpPlanTransport, MessageStream, PlanTransport, StreamFraming};
pub use types::{PlanOutcome, PlanRequest, PlanRun, PlanStatus};
