pub mod dsl;
pub mod engine;
pub mod error;
pub mod gfx;
pub mod input;
pub mod model;
pub mod settings;
