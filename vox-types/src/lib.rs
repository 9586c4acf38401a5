//! Shared data model for the vox job bridge.
//!
//! Everything that crosses a process boundary lives here: the [`Job`] pushed
//! onto the request queue, the [`JobResult`] pushed back by a worker, and the
//! [`RenderedAnswer`] handed to the voice front-end.

mod answer;
mod message;
mod model;

pub use answer::{ImageCard, RenderedAnswer};
pub use message::{Job, JobResult};
pub use model::{ModelKind, Provider};
