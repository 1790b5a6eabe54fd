use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use crate::{error::LoadError, feed::Loader};

/// Where [`FetchLoader::default`] gets its posts from.
pub const POSTS_URL: &str = "https://jsonplaceholder.typicode.com/posts";

/// Loads a JSON array from a fixed URL with the browser's `fetch`.
///
/// The request carries no query, cursor or headers, so every load returns
/// whatever the resource currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchLoader {
    url: Rc<str>,
}

impl FetchLoader {
    pub fn new(url: impl Into<Rc<str>>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for FetchLoader {
    fn default() -> Self {
        Self::new(POSTS_URL)
    }
}

impl<T: DeserializeOwned + 'static> Loader<T> for FetchLoader {
    fn load(&self) -> LocalBoxFuture<'static, Result<Vec<T>, LoadError>> {
        let url = self.url.clone();
        async move { fetch_json(&url).await }.boxed_local()
    }
}

async fn fetch_json<T: DeserializeOwned>(url: &str) -> Result<Vec<T>, LoadError> {
    let window =
        web_sys::window().ok_or_else(|| LoadError::Network("no global window".into()))?;
    tracing::debug!(url, "fetching");
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(LoadError::network)?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| LoadError::Network("fetch did not resolve to a Response".into()))?;
    if !response.ok() {
        return Err(LoadError::Status(response.status()));
    }
    let body = JsFuture::from(response.json().map_err(LoadError::decode)?)
        .await
        .map_err(LoadError::decode)?;
    Ok(serde_wasm_bindgen::from_value(body)?)
}
