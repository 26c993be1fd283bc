//! GPU resource bookkeeping
//!
//! Textures and shader programs live in backend memory that is never
//! reclaimed automatically. The tables in this module own the metadata and
//! hand out opaque handles; the driver releases the backend objects.

pub mod mipmap;
pub mod program_table;
pub mod texture_table;

pub use program_table::{ProgramEntry, ProgramHandle, ProgramKind, ProgramTable};
pub use texture_table::{TextureEntry, TextureHandle, TextureTable};
