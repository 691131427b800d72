mod cell;
mod coordinator;

pub use cell::*;
pub use coordinator::*;
