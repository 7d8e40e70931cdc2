//! The queue of tracks waiting to be played.

use std::collections::VecDeque;

use delegate::delegate;

use super::PlaybackError;
use crate::data::Track;

/// Pending tracks, first in first out. Duplicates are allowed and there is no
/// length limit.
#[derive(Debug, Default, Clone)]
pub struct TrackQueue {
    #[allow(clippy::missing_docs_in_private_items)]
    inner: VecDeque<Track>,
}

impl TrackQueue {
    /// Add a track to the back of the queue, returning the new length.
    pub fn enqueue(&mut self, track: Track) -> usize {
        self.inner.push_back(track);
        self.inner.len()
    }

    /// Remove and return the track at the front.
    pub fn dequeue_next(&mut self) -> Result<Track, PlaybackError> {
        self.inner.pop_front().ok_or(PlaybackError::EmptyQueue)
    }

    /// The first `limit` tracks in play order.
    ///
    /// The iterator can be cloned to walk the same tracks again.
    pub fn peek_all(&self, limit: usize) -> impl ExactSizeIterator<Item = &Track> + Clone {
        self.inner.iter().take(limit)
    }

    delegate! {
        to self.inner {
            /// Number of tracks waiting.
            pub fn len(&self) -> usize;
            /// Whether no tracks are waiting.
            pub fn is_empty(&self) -> bool;
            /// Remove every track. Playback is not affected.
            pub fn clear(&mut self);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::serenity;

    fn track(title: &str) -> Track {
        Track::builder()
            .stream_url(format!("https://stream.example/{title}"))
            .title(title)
            .requester("<@1>")
            .source_channel(serenity::ChannelId::new(1))
            .build()
    }

    fn titles<'a>(tracks: impl Iterator<Item = &'a Track>) -> Vec<&'a str> {
        tracks.map(Track::title).collect()
    }

    #[test]
    fn dequeues_in_insertion_order() {
        let mut queue = TrackQueue::default();
        let names = ["a", "b", "c", "b"];
        for name in names {
            queue.enqueue(track(name));
        }

        let mut out = Vec::new();
        while let Ok(t) = queue.dequeue_next() {
            out.push(t.title().to_string());
        }
        assert_eq!(out, names);
    }

    #[test]
    fn enqueue_reports_length() {
        let mut queue = TrackQueue::default();
        assert_eq!(queue.enqueue(track("a")), 1);
        assert_eq!(queue.enqueue(track("a")), 2);
    }

    #[test]
    fn empty_dequeue_fails() {
        let mut queue = TrackQueue::default();
        assert_eq!(queue.dequeue_next(), Err(PlaybackError::EmptyQueue));
    }

    #[test]
    fn peek_is_bounded_and_restartable() {
        let mut queue = TrackQueue::default();
        for name in ["a", "b", "c"] {
            queue.enqueue(track(name));
        }

        let peek = queue.peek_all(2);
        assert_eq!(peek.len(), 2);
        assert_eq!(titles(peek.clone()), ["a", "b"]);
        assert_eq!(titles(peek), ["a", "b"]);
        assert_eq!(titles(queue.peek_all(10)), ["a", "b", "c"]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn clear_empties() {
        let mut queue = TrackQueue::default();
        queue.enqueue(track("a"));
        queue.clear();
        assert!(queue.is_empty());
    }
}
