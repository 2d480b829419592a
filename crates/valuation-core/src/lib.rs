pub mod error;
pub mod source;
pub mod stats;
pub mod types;

pub use error::*;
pub use source::*;
pub use types::*;
