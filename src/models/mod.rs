pub mod aspect;
pub mod history;
pub mod image;
pub mod options;
pub mod spec;

pub use aspect::*;
pub use history::*;
pub use image::*;
pub use options::*;
pub use spec::*;
