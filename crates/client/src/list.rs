//! Lazy paginated listing.
//!
//! Backends expose "fetch one page" behind an opaque continuation token;
//! this module turns that into a lazy, forward-only stream. A page is
//! fetched only when the consumer asks for the next one, already-yielded
//! pages are never re-fetched, and pages surface in the order the backend
//! returns them - there is no buffering beyond the current page. A failed
//! fetch ends the stream with that error; there is no partial page and no
//! retry.
//!
//! Entity-level duplicates across adjacent pages (possible with eventually
//! consistent backends) are a backend contract issue and are not corrected
//! here.

use std::future::Future;

use futures::stream::{self, Stream, StreamExt};

use crate::error::StorageError;
use crate::types::ListPage;

/// Cursor state of a page sequence.
enum PageState {
    /// No page fetched yet.
    Start,
    /// A page was fetched and pointed at this continuation token.
    Next(String),
    /// A page without a continuation token was fetched, or a fetch failed.
    /// Terminal: no further fetches happen.
    Exhausted,
}

/// Turn a page fetcher into a lazy stream of pages.
///
/// `fetch` receives the continuation token of the previous page (`None` for
/// the first page) and produces the next [`ListPage`]. Each stream item is
/// one page's entities.
pub fn pages<T, F, Fut>(mut fetch: F) -> impl Stream<Item = Result<Vec<T>, StorageError>> + Send
where
    T: Send,
    F: FnMut(Option<String>) -> Fut + Send,
    Fut: Future<Output = Result<ListPage<T>, StorageError>> + Send,
{
    stream::unfold(PageState::Start, move |state: PageState| {
        // The fetch future is created eagerly so the unfold future owns it;
        // no fetch happens in the terminal state.
        let in_flight: Option<Fut> = match state {
            PageState::Start => Some(fetch(None)),
            PageState::Next(token) => Some(fetch(Some(token))),
            PageState::Exhausted => None,
        };
        async move {
            match in_flight?.await {
                Ok(page) => {
                    let next_state: PageState = match page.continuation {
                        Some(token) => PageState::Next(token),
                        None => PageState::Exhausted,
                    };
                    Some((Ok(page.entities), next_state))
                }
                Err(error) => Some((Err(error), PageState::Exhausted)),
            }
        }
    })
}

/// Turn a page fetcher into a lazy stream of individual entities.
///
/// Pages are still fetched one at a time; entities of the current page are
/// yielded in order before the next page is requested.
pub fn entities<T, F, Fut>(fetch: F) -> impl Stream<Item = Result<T, StorageError>> + Send
where
    T: Send,
    F: FnMut(Option<String>) -> Fut + Send,
    Fut: Future<Output = Result<ListPage<T>, StorageError>> + Send,
{
    pages(fetch).flat_map(|page| match page {
        Ok(items) => stream::iter(items.into_iter().map(Ok)).left_stream(),
        Err(error) => stream::iter(vec![Err(error)]).right_stream(),
    })
}
