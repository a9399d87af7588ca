pub mod bottle;
pub mod event;
pub mod flags;
