mod value;
mod date;
mod format;

pub use value::*;
pub use date::*;
pub use format::*;
