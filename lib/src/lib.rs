#![doc = svgbobdoc::transform!(
//! A toolkit for building blog-shaped static site generators.
//!
//! # Overview
//!
//! Folio provides the mechanisms a generator needs to turn a tree of Markdown
//! and YAML files, a directory of layouts, and a Sass stylesheet into a
//! static website. It leaves policy, such as which directories form which
//! collections, to the generator built on top of it.
//!
//! Internally, folio organizes content as follows:
//!
//! ```svgbob
//!                            +-------+
//!                            | Site  |
//!                            +---+---+
//!                                |
//!  +-----------------------------+--------------------------------+
//!  |                                                              |
//!  |  +------------+    +------------+    +--------+   +--------+ |
//!  |  | Collection |... | Collection |    | Static |...| Static | |
//!  |  +------------+    +------+-----+    +--------+   +--------+ |
//!  |                           |                                  |
//!  |    +----------------------+----------------------+           |
//!  |    |  +------+   +------+       +-------------+  |           |
//!  |    |  | item |...| item |       | listing     |  |           |
//!  |    |  +------+   +------+       +-------------+  |           |
//!  |    +---------------------------------------------+           |
//!  +--------------------------------------------------------------+
//! ```
//!
//! In words, a **site** consists of:
//!
//!   * **Collections**, each consisting of:
//!
//!     - _Items_: content files split into front matter, represented as
//!     [`Metadata`], and a body. Every item belongs to exactly one
//!     collection and resolves to exactly one [`route::Route`].
//!
//!     - A _listing_: the items in presentation order. Dated collections are
//!     listed newest first.
//!
//!   * **Static files**, copied to the output verbatim.
//!
//! ## Rendering
//!
//! A site is typically rendered via the following set of operations:
//!
//! 1. Files are discovered with [`fstree::FsTree`].
//! 2. Front matter is split from each body with [`markdown::frontmatter`].
//! 3. Items are grouped into collections and assigned routes.
//! 4. Each body is rendered and wrapped in its chain of
//!    [`templating::Layout`]s by a [`Renderer`].
//! 5. The stylesheet is compiled with the selected skin by [`sass`].
//! 6. Everything is written to an output directory.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod fstree;
pub mod value;
pub mod taxonomy;
pub mod markdown;
pub mod templating;
pub mod route;
#[cfg(feature = "sass")]
pub mod sass;

pub use taxonomy::*;

pub use rayon;
