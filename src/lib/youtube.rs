//! Functionality for interfacing with youtube (e.g. searches).
//!
//! Everything here shells out to `yt-dlp`, at most a configured number of
//! processes at a time.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::instrument;
use url::Url;

use crate::data::Track;
use crate::serenity::ChannelId;

/// Ways looking up a track can fail.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No search results found.")]
    NoResults,
    #[error("Could not get audio stream URL.")]
    NoStream,
    #[error("{stderr}")]
    Exited { stderr: String },
    #[error("Failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Unexpected yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("yt-dlp output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Search workers shut down.")]
    PoolClosed,
}

/// A youtube video with formatted metadata and its url.
pub struct SearchResult {
    /// Display name
    pub name: String,
    /// The url of source
    pub url: String,
}

/// Turns queries into [Track]s.
#[derive(Debug)]
pub struct Resolver {
    /// One permit per yt-dlp process allowed to run.
    workers: Semaphore,
}

impl Resolver {
    /// `workers` is the max amount of concurrent yt-dlp processes.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: Semaphore::new(workers.max(1)),
        }
    }

    /// Find the stream of a link or the first search result for anything else.
    #[instrument(skip(self, query, requester), fields(query = query.as_ref()))]
    pub async fn resolve(
        &self,
        query: impl AsRef<str>,
        requester: String,
        channel: ChannelId,
    ) -> Result<Track, ResolveError> {
        let uri = resolve_uri(query.as_ref());
        let ytdlp_args = [
            "--no-warnings",
            "--ignore-config",
            "--no-playlist",
            "--socket-timeout",
            "20",
            "--retries",
            "1",
            "-f",
            "bestaudio/best",
            "-J",
            uri.as_str(),
        ];

        let json = self.run(&ytdlp_args).await?;
        let info = Info::from_json(&json)?;
        info.into_track(requester, channel)
    }

    /// Searches youtube for the given query.
    ///
    /// `limit` is the max amount of results to get.
    #[instrument(skip(self, query), fields(query = query.as_ref()))]
    pub async fn suggest(
        &self,
        query: impl AsRef<str>,
        limit: u8,
    ) -> Result<Vec<SearchResult>, ResolveError> {
        let uri = &format!("ytsearch{limit}:{}", query.as_ref());

        // Discord enforces a 100 char limit so we budget
        // Format is title[duration](views)-channel
        let format: &str = &[
            "%(title).60s ",          // Title, at most 60 chars
            "[%(duration_string)s] ", // Duration in '[HH:MM:SS]' format, at most 10 chars
            // View count in '(dddc views)' format, at most 12 chars
            "(%(view_count)D ", // add decimal suffixes (e.g 10M, 200k, ...)
            " views)",          // add ' views' as suffix
            "- ",
            "%(channel).14s", // Channel name in '-name' format, max 15 chars
        ]
        .concat();

        let ytdlp_args = [
            "--no-warnings",
            "--ignore-config",
            "--flat-playlist",
            "--print",
            format,
            "--print",
            "webpage_url",
            uri.as_str(),
        ];

        let out_string = self.run(&ytdlp_args).await?;
        Ok(parse_suggestions(&out_string))
    }

    /// Helper function that actually calls yt-dlp, returning its stdout.
    async fn run(&self, args: &[&str]) -> Result<String, ResolveError> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|_| ResolveError::PoolClosed)?;

        let ytdlp_output = tokio::process::Command::new("yt-dlp")
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !ytdlp_output.status.success() {
            let stderr = String::from_utf8_lossy(&ytdlp_output.stderr);
            // yt-dlp puts the reason on the last line
            let reason = stderr.lines().last().unwrap_or("yt-dlp failed").trim();
            return Err(ResolveError::Exited {
                stderr: reason.to_string(),
            });
        }

        Ok(String::from_utf8(ytdlp_output.stdout)?)
    }
}

/// Links are looked up directly, everything else is searched for.
fn resolve_uri(query: &str) -> String {
    let query = query.trim();
    match Url::parse(query) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => query.to_string(),
        _ => format!("ytsearch1:{query}"),
    }
}

/// Pairs up the alternating name and url lines printed by [Resolver::suggest].
fn parse_suggestions(output: &str) -> Vec<SearchResult> {
    let mut iter = output.lines();
    let mut results = Vec::new();

    while let (Some(name), Some(url)) = (iter.next(), iter.next()) {
        results.push(SearchResult {
            name: name.to_string(),
            url: url.to_string(),
        });
    }

    results
}

/// The parts of yt-dlp's json output we use.
/// Searches put the videos in `entries`, unavailable ones are `null`.
#[derive(Debug, Deserialize)]
struct Info {
    url: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    entries: Option<Vec<Option<Info>>>,
}

impl Info {
    /// Parse the json and pick the video to play.
    fn from_json(json: &str) -> Result<Info, ResolveError> {
        let mut info: Info = serde_json::from_str(json)?;
        if let Some(entries) = info.entries.take() {
            info = entries
                .into_iter()
                .flatten()
                .next()
                .ok_or(ResolveError::NoResults)?;
        }
        Ok(info)
    }

    fn into_track(self, requester: String, channel: ChannelId) -> Result<Track, ResolveError> {
        let stream_url = self.url.ok_or(ResolveError::NoStream)?;
        // Negative and NaN durations end up as zero.
        let duration = Duration::from_secs(self.duration.unwrap_or_default() as u64);

        Ok(Track::builder()
            .stream_url(stream_url)
            .title(self.title.unwrap_or_else(|| "Unknown Title".to_string()))
            .duration(duration)
            .requester(requester)
            .source_channel(channel)
            .maybe_page_url(self.webpage_url)
            .build())
    }
}
