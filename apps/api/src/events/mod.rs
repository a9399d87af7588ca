pub mod dismissal;
pub mod handlers;
pub mod matcher;
pub mod seed;
pub mod window;
