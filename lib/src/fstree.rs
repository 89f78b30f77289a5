use std::sync::Arc;
use std::path::Path;
use std::{fs, fmt};

use rustc_hash::FxHashMap;

use crate::error::Result;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) usize);

/// A snapshot of a directory tree, in sorted depth-first order, with every
/// entry addressable by its path relative to the root.
#[derive(Debug)]
pub struct FsTree {
    root: Arc<Path>,
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub relative: Arc<Path>,
    pub file_name: String,
    pub file_type: fs::FileType,
    pub parent: Option<EntryId>,
    pub depth: usize,
}

impl FsTree {
    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::build_with(root, |_, _| true)
    }

    /// Walks `root` in parallel. `keep` is called with the root-relative path
    /// of every entry and whether it is a directory; rejected directories are
    /// not descended into. Hidden entries are always skipped.
    pub fn build_with<P, F>(root: P, keep: F) -> Result<Self>
        where P: AsRef<Path>,
              F: Fn(&Path, bool) -> bool + Send + Sync + 'static,
    {
        use jwalk::WalkDir;

        let root = root.as_ref();
        if !root.is_dir() {
            return err! {
                "site root must be an existing directory",
                "search root" => root.display(),
            }
        }

        let root: Arc<Path> = Arc::from(root.canonicalize()?.into_boxed_path());
        let walk_root = root.clone();
        let walker = WalkDir::new(&*root)
            .sort(true)
            .skip_hidden(true)
            .follow_links(true)
            .process_read_dir(move |_, _, _, children| {
                children.retain(|child| match child {
                    Ok(e) => match e.path().strip_prefix(&*walk_root) {
                        Ok(relative) => keep(relative, e.file_type.is_dir()),
                        Err(_) => false,
                    },
                    Err(_) => true,
                })
            });

        let mut tree = FsTree { root, entries: vec![], map: FxHashMap::default() };
        for result in walker {
            match result {
                Ok(entry) => tree.insert(entry),
                Err(e) => tracing::warn!("skipping unreadable entry: {e}"),
            }
        }

        if tree.entries.is_empty() {
            return err! {
                "file system tree discovery yielded zero entries",
                "search root" => tree.root.display(),
            }
        }

        Ok(tree)
    }

    fn insert(&mut self, entry: jwalk::DirEntry<((), ())>) {
        let path: Arc<Path> = Arc::from(entry.path().into_boxed_path());
        let relative: Arc<Path> = match path.strip_prefix(&*self.root) {
            Ok(relative) => Arc::from(relative),
            Err(_) => return,
        };

        let parent = relative.parent().and_then(|p| self.map.get(p)).copied();
        let id = EntryId(self.entries.len());
        self.map.insert(relative.clone(), id);
        self.entries.push(Entry {
            id,
            path,
            relative,
            file_name: entry.file_name.to_string_lossy().into_owned(),
            file_type: entry.file_type,
            parent,
            depth: entry.depth,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The canonical root path.
    pub fn root_path(&self) -> &Arc<Path> {
        &self.root
    }

    pub fn root(&self) -> &Entry {
        &self[self.root_id()]
    }

    pub fn root_id(&self) -> EntryId {
        EntryId(0)
    }

    /// Looks up an entry by its root-relative path.
    #[inline]
    pub fn get<P: AsRef<Path>>(&self, relative: P) -> Option<&Entry> {
        self.map.get(relative.as_ref()).map(|&id| &self[id])
    }

    /// Like [`FsTree::get()`] but only returns regular files.
    pub fn get_file<P: AsRef<Path>>(&self, relative: P) -> Option<&Entry> {
        self.get(relative).filter(|e| e.is_file())
    }

    pub fn ancestors_of(&self, mut entry: EntryId) -> impl Iterator<Item = EntryId> + '_ {
        std::iter::from_fn(move || {
            let parent = self[entry].parent?;
            entry = parent;
            Some(parent)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// All regular files in sorted depth-first order.
    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.iter().filter(|e| e.is_file())
    }

    /// All regular files beneath the root-relative directory `dir`.
    pub fn files_under<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = &'a Entry> + 'a {
        self.files().filter(move |e| e.relative.starts_with(dir))
    }
}

impl Entry {
    /// File name without the extension.
    pub fn file_stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some(("", _)) | None => &self.file_name,
            Some((left, _)) => left,
        }
    }

    /// The final extension, if any.
    pub fn file_ext(&self) -> Option<&str> {
        match self.file_name.rsplit_once('.') {
            Some(("", _)) | None => None,
            Some((_, right)) => Some(right),
        }
    }

    pub fn is_file(&self) -> bool {
        self.file_type.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.file_type.is_dir()
    }

    /// Path relative to the root of the tree.
    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    /// Path relative to `other`. `other` must be an ancestor of `self`.
    pub fn path_relative_to(&self, other: &Entry) -> Option<&Path> {
        self.relative.strip_prefix(&other.relative).ok()
    }
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
