pub mod error;
pub mod outcome;
pub mod task;

pub use error::*;
pub use outcome::*;
pub use task::*;
