mod verify;

pub use verify::*;
