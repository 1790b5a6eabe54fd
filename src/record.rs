use serde::Deserialize;

/// One post as served by the feed endpoint.
///
/// Only `title` and `body` are kept; other fields of the payload are ignored.
/// Records carry no identity, entries are keyed by their position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Record {
    pub title: String,
    pub body: String,
}

impl Record {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}
