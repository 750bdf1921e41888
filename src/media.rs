//! Playback URL formatting.
//!
//! Audio is streamed by an external media host; the survey only needs to
//! turn item ids into links.

/// Default template: Jamendo's MP3 stream endpoint.
pub const DEFAULT_URL_TEMPLATE: &str = "https://mp3d.jamendo.com/?trackid={id}&format=mp32";

/// Formats item ids into playback URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLinks {
    template: String,
}

impl Default for MediaLinks {
    fn default() -> Self {
        Self::new(DEFAULT_URL_TEMPLATE)
    }
}

impl MediaLinks {
    /// Create a formatter from a template containing `{id}`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Playback URL for an item.
    pub fn url(&self, id: u64) -> String {
        self.template.replace("{id}", &id.to_string())
    }
}
