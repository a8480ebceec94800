//! The stage pipeline around the simulation core and its reference collaborators.

pub mod channel;
pub mod ecosystem;
pub mod physics;
pub mod pipeline;
pub mod render;
pub mod shutdown;

pub use ecosystem::{ChurnStats, EcosystemHandle, EcosystemLogic, RandomChurn};
pub use physics::{EulerPhysics, PhysicsWorld};
pub use pipeline::{ParamUpdate, Pipeline, PipelineOptions, PipelineReport};
pub use render::{RenderSink, TracingRenderSink};
pub use shutdown::ShutdownSignal;
