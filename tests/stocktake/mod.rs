pub mod messaging;
pub mod outputs;
pub mod pit;
pub mod removals;
pub mod resume;
pub mod slicing;
