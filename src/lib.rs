pub mod chips;
pub mod compiler;
pub mod diagnostics;
pub mod effects;
pub mod error;
pub mod target;

pub use compiler::{Compilation, Compiler, SongScript};
pub use error::Error;
