use std::cmp::Reverse;
use std::path::Path;
use std::sync::Arc;

use crate::taxonomy::*;

#[derive(Debug)]
pub struct Collection {
    pub name: Arc<str>,
    /// Root-relative directory. `None` for a collection rooted at the site
    /// root.
    pub dir: Option<Arc<Path>>,
    /// Whether file names carry a `YYYY-MM-DD-` token.
    pub dated: bool,
    /// The route pattern for items without an explicit permalink.
    pub permalink: Arc<str>,
    pub layout: Option<Arc<str>>,
    /// Every item, in source path order.
    pub items: Vec<Arc<Item>>,
    /// The items in presentation order.
    pub listing: Vec<Arc<Item>>,
}

impl Collection {
    pub fn new(name: Arc<str>, dir: Option<Arc<Path>>, dated: bool, permalink: Arc<str>) -> Self {
        Collection {
            name,
            dir,
            dated,
            permalink,
            layout: None,
            items: vec![],
            listing: vec![],
        }
    }

    pub fn with_layout(mut self, layout: Option<Arc<str>>) -> Self {
        self.layout = layout;
        self
    }

    pub fn push(&mut self, item: Arc<Item>) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sorts the items by source path and rebuilds the listing.
    ///
    /// Dated collections list only items with a date token, newest first,
    /// ties broken by file name (also descending). Other collections list
    /// every item by ascending source path.
    pub fn finish(&mut self) {
        self.items.sort_by(|a, b| a.relative.cmp(&b.relative));
        self.listing = match self.dated {
            true => {
                let mut listing: Vec<_> = self.items.iter()
                    .filter(|item| item.date_token.is_some())
                    .cloned()
                    .collect();

                listing.sort_by_key(|item| Reverse((item.date_token, item.file_name().to_owned())));
                listing
            }
            false => self.items.clone(),
        };
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::value::Date;

    fn item(name: &str, date: Option<(i32, u32, u32)>) -> Arc<Item> {
        let relative: Arc<Path> = Path::new("_posts").join(name).into();
        let token = date.and_then(|(y, m, d)| Date::from_ymd(y, m, d));
        let item = Item::new(relative.clone(), relative, "posts".into())
            .with_date("x".into(), token, token);

        Arc::new(item)
    }

    #[test]
    fn dated_listing_is_descending_and_skips_undated() {
        let mut posts = Collection::new("posts".into(), None, true, "/:title/".into());
        posts.push(item("2023-06-01-b.md", Some((2023, 6, 1))));
        posts.push(item("2024-01-01-a.md", Some((2024, 1, 1))));
        posts.push(item("undated.md", None));
        posts.push(item("2023-06-01-c.md", Some((2023, 6, 1))));
        posts.finish();

        let names: Vec<_> = posts.listing.iter().map(|i| i.file_name()).collect();
        assert_eq!(names, ["2024-01-01-a.md", "2023-06-01-c.md", "2023-06-01-b.md"]);
        assert_eq!(posts.items.len(), 4);
        assert_eq!(posts.items[0].file_name(), "2023-06-01-b.md");
    }

    #[test]
    fn listing_is_independent_of_insertion_order() {
        let build = |names: &[&str]| {
            let mut c = Collection::new("posts".into(), None, true, "/:title/".into());
            for name in names {
                let day = name[8..10].parse().unwrap();
                c.push(item(name, Some((2024, 1, day))));
            }

            c.finish();
            c.listing.iter().map(|i| i.file_name().to_string()).collect::<Vec<_>>()
        };

        let a = build(&["2024-01-01-x.md", "2024-01-03-y.md", "2024-01-02-z.md"]);
        let b = build(&["2024-01-02-z.md", "2024-01-01-x.md", "2024-01-03-y.md"]);
        assert_eq!(a, b);
    }
}
