//! gridbus-core: chunk model, frame format, validation and configuration.
//! All other gridbus crates depend on this one.

pub mod chunk;
pub mod config;
pub mod frame;
pub mod object_id;
pub mod validate;

pub use chunk::{Chunk, ChunkKey, FileInfo, DEFAULT_BUCKET};
pub use frame::{Frame, FrameError};
pub use object_id::ObjectId;
pub use validate::{ChunkValidator, ValidationError};
