use serde::{Deserialize, Serialize};

/// Ordered query-string parameters.
///
/// The same pairs are sent on the request and used as the filter half of a
/// cache key, so two screens asking for the same filtered list share one
/// cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Push only when a value is present; blank strings count as absent
    pub fn push_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => {
                let v = v.to_string();
                if v.trim().is_empty() {
                    self
                } else {
                    self.push(key, v)
                }
            }
            None => self,
        }
    }

    pub fn page(self, page: Page) -> Self {
        self.push("skip", page.skip).push("limit", page.limit)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// `skip`/`limit` pagination accepted by every list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(skip: u32, limit: u32) -> Self {
        Self { skip, limit }
    }

    pub fn first(limit: u32) -> Self {
        Self { skip: 0, limit }
    }

    pub fn next(&self) -> Self {
        Self {
            skip: self.skip + self.limit,
            limit: self.limit,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}
