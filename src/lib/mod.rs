//! Misc

pub mod call;
pub mod events;
pub mod youtube;

use std::time::Duration;

/// Helper function to format a duration as `m:ss`, or `h:mm:ss` for long tracks.
pub fn format_duration(dur: &Duration) -> String {
    let total_secs = dur.as_secs();
    let total_mins = total_secs / 60;

    let hours = total_mins / 60;
    let mins = total_mins % 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}")
    } else {
        format!("{mins}:{secs:02}")
    }
}
