pub mod frontmatter;
mod render;

pub use render::*;
