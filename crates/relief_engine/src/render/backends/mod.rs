//! Graphics device implementations
//!
//! Only the headless tracking device ships with the engine; windowed
//! backends implement [`crate::render::GraphicsDevice`] outside this crate.

pub mod headless;

pub use headless::{Command, HeadlessDevice};
