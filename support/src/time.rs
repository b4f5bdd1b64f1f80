//! Timestamp helpers used by the client session driver to produce the
//! `[HH:MM]` prefix attached to every incoming chat line.

use chrono::Timelike;

/// Formats the current local time as `HH:MM`, the prefix the client
/// session driver attaches to incoming `SIG·REG` chat lines.
#[inline]
pub fn hour_minute() -> String {
    let now = chrono::Local::now();
    format!("{:02}:{:02}", now.hour(), now.minute())
}
