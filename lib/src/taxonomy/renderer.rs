use std::sync::Arc;

use rayon::prelude::*;

use crate::taxonomy::*;

/// Renders every item of every collection and every static file of `site` in
/// parallel, in site order. Returns every error if any render fails.
#[inline(always)]
pub fn render_site<R>(renderer: &R, site: &Site) -> Result<Vec<R::Render>, Vec<R::Error>>
    where R: Renderer + ?Sized
{
    let (content, statics): (Vec<_>, Vec<_>) = rayon::join(
        || site.collections.par_iter()
            .flat_map(|collection| renderer.render_collection(site, collection))
            .collect(),
        || site.statics.par_iter()
            .map(|file| renderer.render_static(site, file))
            .collect()
    );

    let (mut rendered, mut errors) = (vec![], vec![]);
    for result in content.into_iter().chain(statics) {
        match result {
            Ok(render) => rendered.push(render),
            Err(e) => errors.push(e),
        }
    }

    match errors.is_empty() {
        true => Ok(rendered),
        false => Err(errors),
    }
}

#[inline(always)]
pub fn render_collection<R>(
    renderer: &R,
    site: &Site,
    collection: &Arc<Collection>,
) -> Vec<Result<R::Render, R::Error>>
    where R: Renderer + ?Sized
{
    collection.items.par_iter()
        .map(|item| renderer.render_item(site, collection, item))
        .collect()
}

pub trait Renderer: Sync {
    type Render: Send;

    type Error: Send;

    #[inline(always)]
    fn render_site(&self, site: &Site) -> Result<Vec<Self::Render>, Vec<Self::Error>> {
        render_site(self, site)
    }

    #[inline(always)]
    fn render_collection(
        &self,
        site: &Site,
        collection: &Arc<Collection>
    ) -> Vec<Result<Self::Render, Self::Error>> {
        render_collection(self, site, collection)
    }

    fn render_item(
        &self,
        site: &Site,
        collection: &Arc<Collection>,
        item: &Arc<Item>
    ) -> Result<Self::Render, Self::Error>;

    fn render_static(&self, site: &Site, file: &Arc<StaticFile>) -> Result<Self::Render, Self::Error>;
}
