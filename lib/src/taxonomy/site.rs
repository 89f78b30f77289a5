use std::path::Path;
use std::sync::Arc;

use derive_more::Debug;

use crate::taxonomy::*;

#[derive(Debug)]
pub struct Site {
    pub root: Arc<Path>,
    pub collections: Vec<Arc<Collection>>,
    #[debug(ignore)]
    pub statics: Vec<Arc<StaticFile>>,
}

impl Site {
    pub fn new(root: Arc<Path>) -> Site {
        Site { root, collections: vec![], statics: vec![] }
    }

    pub fn collection(&self, name: &str) -> Option<&Arc<Collection>> {
        self.collections.iter().find(|c| &*c.name == name)
    }

    /// Every item paired with its collection, collection by collection.
    pub fn items(&self) -> impl Iterator<Item = (&Arc<Collection>, &Arc<Item>)> {
        self.collections.iter()
            .flat_map(|c| c.items.iter().map(move |item| (c, item)))
    }

    pub fn item_count(&self) -> usize {
        self.collections.iter().map(|c| c.len()).sum()
    }

    pub fn visualize(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "🗂 {}", self.root.display());
        for (i, collection) in self.collections.iter().enumerate() {
            let last = i + 1 == self.collections.len() && self.statics.is_empty();
            let (branch, rail) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
            let _ = writeln!(out, "{branch}📦 {} ({})", collection.name, collection.len());
            for (j, item) in collection.listing.iter().enumerate() {
                let leaf = if j + 1 == collection.listing.len() { "└── " } else { "├── " };
                let _ = writeln!(out, "{rail}{leaf}📝 {}", item.relative.display());
            }
        }

        if !self.statics.is_empty() {
            let _ = writeln!(out, "└── 💾 {} static files", self.statics.len());
        }

        out
    }
}
