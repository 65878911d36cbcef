use reqwest::header::{HeaderMap, LINK};
use tracing::warn;
use url::Url;

use crate::github::ApiError;

/// Finds the `rel="next"` target of a `Link` header value.
///
/// The header looks like `<https://…?page=2>; rel="next", <https://…?page=5>; rel="last"`.
fn find_next(link: &str) -> Option<&str> {
    link.split(',').find_map(|entry| {
        let mut params = entry.split(';');
        let target = params
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;

        params
            .any(|param| {
                param
                    .trim()
                    .strip_prefix("rel=")
                    .map(|rel| rel.trim_matches('"'))
                    .is_some_and(|rel| rel.split_whitespace().any(|rel| rel == "next"))
            })
            .then_some(target)
    })
}

/// URL of the page following the response these headers belong to, `None` on the last page.
pub(crate) fn next_page(headers: &HeaderMap) -> Result<Option<Url>, ApiError> {
    let Some(link) = headers.get(LINK) else {
        return Ok(None);
    };

    let Ok(link) = link.to_str() else {
        warn!("ignoring non-ASCII Link header: {:?}", link);
        return Ok(None);
    };

    match find_next(link) {
        Some(next) => Ok(Some(Url::parse(next)?)),
        None => Ok(None),
    }
}
