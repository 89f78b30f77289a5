mod site;
mod collection;
mod item;
mod renderer;
mod metadata;

pub use site::*;
pub use collection::*;
pub use item::*;
pub use metadata::*;
pub use renderer::*;
