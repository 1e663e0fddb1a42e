use std::sync::Arc;

use askama::Template;
use tokio::sync::RwLock;

use crate::fetcher::EntryRecord;
use crate::registry::FeedDescriptor;

/// Opening tag of one rendered entry node.
const ENTRY_NODE: &str = r#"<article class="entry""#;

pub type SharedContainer = Arc<RwLock<RenderContainer>>;

#[derive(Template)]
#[template(path = "entries.html")]
pub struct EntriesTemplate<'a> {
    pub entries: &'a [EntryRecord],
}

/// The complete rendered form of one successfully loaded feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFeed {
    pub title: String,
    pub html: String,
}

pub fn render_feed(
    feed: &FeedDescriptor,
    entries: &[EntryRecord],
) -> Result<RenderedFeed, askama::Error> {
    let html = EntriesTemplate { entries }.render()?;
    Ok(RenderedFeed {
        title: feed.name.clone(),
        html,
    })
}

/// The feed content region. Its contents are the only record of which feed
/// is currently loaded.
#[derive(Debug, Default)]
pub struct RenderContainer {
    current: Option<RenderedFeed>,
}

impl RenderContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedContainer {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Swap in a new feed wholesale, returning what was shown before.
    pub fn replace(&mut self, rendered: RenderedFeed) -> Option<RenderedFeed> {
        self.current.replace(rendered)
    }

    pub fn html(&self) -> &str {
        self.current.as_ref().map(|r| r.html.as_str()).unwrap_or("")
    }

    pub fn title(&self) -> Option<&str> {
        self.current.as_ref().map(|r| r.title.as_str())
    }

    pub fn entry_count(&self) -> usize {
        self.html().matches(ENTRY_NODE).count()
    }

    pub fn has_entries(&self) -> bool {
        self.entry_count() > 0
    }
}
