use std::future::Future;

use gistsync_core::error::GistSyncError;

/// One page of a listing plus the cursor of the page after it.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<u32>,
}

/// Fetch pages starting at page 1 until a page reports no `next` cursor.
///
/// Items are returned in the order received. The first failing page aborts
/// the listing and nothing collected so far is returned.
pub async fn paginate<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, GistSyncError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, GistSyncError>>,
{
    let mut all = Vec::new();
    let mut page = 1u32;

    loop {
        let Page { items, next } = fetch(page).await?;
        tracing::debug!(page, count = items.len(), ?next, "fetched page");
        all.extend(items);

        match next {
            Some(n) if n > page => page = n,
            Some(n) => {
                tracing::warn!(page, next = n, "next page cursor does not advance, stopping");
                break;
            }
            None => break,
        }
    }

    Ok(all)
}

/// Extract the `page` query parameter of the `rel="next"` entry in an
/// RFC 8288 `Link` header.
pub fn next_page_from_link(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        let url = url::Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    })
}
