//! Channel selection by name

use crate::crawler::CrawlError;
use crate::ChannelRecord;

/// Token selecting every channel
pub const WILDCARD: &str = "*";

/// Which channels to archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    /// Every listed channel
    All,
    /// Channels whose name is in the list
    Named(Vec<String>),
}

impl ChannelSelector {
    /// Build a selector from command line names; a leading `*` selects all
    ///
    /// Names are trimmed and a leading `#` is dropped. A `*` after the first
    /// position is an ordinary name.
    ///
    /// # Errors
    /// Returns `InvalidSelection` when no name is given
    pub fn from_names<I, S>(names: I) -> Result<Self, CrawlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .map(|n| n.trim().trim_start_matches('#').to_string())
            .filter(|n| !n.is_empty())
            .collect();

        if names.is_empty() {
            return Err(CrawlError::InvalidSelection(
                "at least one channel name (or `*`) is required".to_string(),
            ));
        }
        if names[0] == WILDCARD {
            return Ok(Self::All);
        }
        Ok(Self::Named(names))
    }

    /// Keep the selected channels in list order
    ///
    /// # Returns
    /// The selected channels and the requested names that matched nothing
    pub fn select(&self, channels: Vec<ChannelRecord>) -> (Vec<ChannelRecord>, Vec<String>) {
        match self {
            Self::All => (channels, Vec::new()),
            Self::Named(names) => {
                let selected: Vec<ChannelRecord> = channels
                    .into_iter()
                    .filter(|c| names.iter().any(|n| *n == c.name))
                    .collect();
                let unmatched = names
                    .iter()
                    .filter(|n| !selected.iter().any(|c| c.name == **n))
                    .cloned()
                    .collect();
                (selected, unmatched)
            }
        }
    }
}
