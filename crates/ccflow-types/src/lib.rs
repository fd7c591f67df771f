// Types layer - data model shared by the engine and the CLI.
// Holds no logic beyond construction helpers; assembly lives in ccflow-engine.

mod error;
mod session;

pub use error::{Error, Result};
pub use session::{Block, BlockKind, CompactMetadata, Segment, SegmentKind, Session, Turn};
