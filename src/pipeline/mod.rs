//! Per-request orchestration.
//!
//! [`Pipeline::run`] drives a request through
//! `Received → Retrieving → Scoring → Explaining → Assembling → Done` and always
//! returns a complete [`ResponseEnvelope`]. Any failure moves the request to
//! `Failed` and produces an error envelope with the request id attached.

pub mod admission;
pub mod envelope;
pub mod error;
pub mod orchestrator;
pub mod recorder;
pub mod request;
pub mod stage;


pub use admission::{AdmissionControl, AdmissionPermit};
pub use envelope::{ResponseEnvelope, ResponseStatus, StageTiming};
pub use error::PipelineError;
pub use orchestrator::{Pipeline, PipelineSettings};
#[cfg(any(test, feature = "mock"))]
pub use recorder::{MemoryRecorder, PanickingRecorder};
pub use recorder::{EventRecorder, PipelineEvent, TracingRecorder};
pub use request::MatchRequest;
pub use stage::{PipelineStage, StageTrace};
