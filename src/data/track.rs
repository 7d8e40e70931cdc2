//! A resolved, playable track and its display.

use std::fmt::Display;
use std::time::Duration;

use crate::lib;
use crate::serenity;

/// A playable audio stream plus what is needed to show it to users.
/// Tracks are never changed after they are resolved.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
#[builder(on(String, into))]
pub struct Track {
    /// Direct url of the audio stream.
    stream_url: String,
    /// Title of the track.
    title: String,
    /// Length of the track, zero if unknown.
    #[builder(default)]
    duration: Duration,
    /// Mention of the user that requested the track.
    requester: String,
    /// Text channel the track was requested from.
    source_channel: serenity::ChannelId,
    /// Url of the page the stream was extracted from.
    page_url: Option<String>,
}

impl Track {
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn requester(&self) -> &str {
        &self.requester
    }

    pub fn source_channel(&self) -> serenity::ChannelId {
        self.source_channel
    }

    pub fn page_url(&self) -> Option<&str> {
        self.page_url.as_deref()
    }

    /// Formatted duration, `None` when unknown.
    pub fn duration_string(&self) -> Option<String> {
        if self.duration.is_zero() {
            None
        } else {
            Some(lib::format_duration(&self.duration))
        }
    }
}

/// Markdown for queue listings: linked title, duration and requester.
impl Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let title = &self.title;
        match &self.page_url {
            Some(url) => write!(f, "**[{title}]({url})**")?,
            None => write!(f, "**{title}**")?,
        }
        if let Some(duration) = self.duration_string() {
            write!(f, " `{duration}`")?;
        }
        write!(f, " - {}", self.requester)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn track(page_url: Option<&str>, secs: u64) -> Track {
        Track::builder()
            .stream_url("https://stream.example/a")
            .title("Never Gonna Give You Up")
            .duration(Duration::from_secs(secs))
            .requester("<@42>")
            .source_channel(serenity::ChannelId::new(7))
            .maybe_page_url(page_url.map(String::from))
            .build()
    }

    #[test]
    fn display_with_link() {
        let t = track(Some("https://youtu.be/dQw4w9WgXcQ"), 213);
        assert_eq!(
            t.to_string(),
            "**[Never Gonna Give You Up](https://youtu.be/dQw4w9WgXcQ)** `3:33` - <@42>"
        );
    }

    #[test]
    fn unknown_duration_is_hidden() {
        let t = track(None, 0);
        assert_eq!(t.duration_string(), None);
        assert_eq!(t.to_string(), "**Never Gonna Give You Up** - <@42>");
    }
}
