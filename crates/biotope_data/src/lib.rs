//! Plain data shared by the agent registry, the force kernel and the pipeline stages.
//!
//! Nothing in this crate owns behaviour beyond small vector helpers; every payload that
//! crosses a stage boundary lives here so that transports only need `serde`.

pub mod data;

pub use data::agent::{AgentId, Species, Vec2, SPECIES_COUNT};
pub use data::frames::{
    ForceFrame, InitPayload, LifecycleEvent, PositionFrame, RegistrySnapshot, RenderFrame,
};
