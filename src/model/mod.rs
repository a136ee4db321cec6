pub mod color;
pub mod vector;

// Re-export commonly used types at the model level.
pub use color::Color;
pub use vector::Vector2;
