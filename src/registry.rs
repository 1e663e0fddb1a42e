use serde::Deserialize;
use thiserror::Error;

/// A named feed source. `source` is the locator handed to the fetch service.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FeedDescriptor {
    pub name: String,
    #[serde(rename = "url")]
    pub source: String,
}

impl FeedDescriptor {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("feed registry is empty")]
    EmptyRegistry,
    #[error("feed #{index} has an empty name")]
    EmptyName { index: usize },
    #[error("feed #{index} ('{name}') has an empty url")]
    EmptySource { index: usize, name: String },
}

/// The ordered, read-only table of feeds the reader can switch between.
///
/// Never empty, and every descriptor has a non-blank name and source.
#[derive(Debug, Clone)]
pub struct FeedRegistry {
    feeds: Vec<FeedDescriptor>,
}

impl FeedRegistry {
    pub fn new(feeds: Vec<FeedDescriptor>) -> Result<Self, ConfigError> {
        if feeds.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }

        for (index, feed) in feeds.iter().enumerate() {
            if feed.name.trim().is_empty() {
                return Err(ConfigError::EmptyName { index });
            }
            if feed.source.trim().is_empty() {
                return Err(ConfigError::EmptySource {
                    index,
                    name: feed.name.clone(),
                });
            }
        }

        Ok(Self { feeds })
    }

    pub fn get(&self, index: usize) -> Option<&FeedDescriptor> {
        self.feeds.get(index)
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    // Always false once constructed.
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn feeds(&self) -> &[FeedDescriptor] {
        &self.feeds
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedDescriptor> {
        self.feeds.iter()
    }
}
