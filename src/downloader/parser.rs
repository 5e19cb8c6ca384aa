//! Line-oriented parsing of the downloader's console output
//!
//! The binary reports progress on stdout and failures on stderr, one line
//! at a time. Only a handful of line shapes matter; everything else is
//! passed through as noise for debug logging.

use once_cell::sync::Lazy;
use regex::Regex;

static PLAYLIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[download\] Downloading video (?P<current>[0-9]+) of [0-9]+$")
        .expect("valid regex")
});

static ITEM_IDENTIFIED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[youtube\] (?P<id>.+): Downloading webpage$").expect("valid regex")
});

// Some locales print "42,5%", so both separators are accepted.
static PROGRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[download\]\s\s?(?P<percent>[0-9]+(?:[.,][0-9]+)?)%.*$").expect("valid regex")
});

static TRANSCODING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[ffmpeg\]\s.*Destination:.*$").expect("valid regex"));

static ERROR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ERROR:\s(?P<message>.*)$").expect("valid regex"));

/// A recognized downloader output line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Playlist advanced to the 1-based item at `index`
    PlaylistItem { index: u32 },
    /// The source site reported the identifier of the current item
    ItemIdentified { item_id: String },
    /// Download progress for the current item
    Progress { percent: f64 },
    /// The transcoder began writing its output file
    Transcoding,
}

/// Parse a stdout line. `None` for lines that carry no state.
pub fn parse_stdout(line: &str) -> Option<ParsedLine> {
    if let Some(caps) = PLAYLIST_ITEM_RE.captures(line) {
        let index = caps["current"].parse().ok()?;
        return Some(ParsedLine::PlaylistItem { index });
    }
    if let Some(caps) = ITEM_IDENTIFIED_RE.captures(line) {
        return Some(ParsedLine::ItemIdentified {
            item_id: caps["id"].to_string(),
        });
    }
    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent = caps["percent"].replace(',', ".").parse().ok()?;
        return Some(ParsedLine::Progress { percent });
    }
    if TRANSCODING_RE.is_match(line) {
        return Some(ParsedLine::Transcoding);
    }
    None
}

/// Parse a stderr line into an error message, if it is one
pub fn parse_stderr(line: &str) -> Option<String> {
    ERROR_RE
        .captures(line)
        .map(|caps| caps["message"].to_string())
}

/// Suppresses progress notifications until they gain at least
/// `threshold` percentage points over the last one sent.
#[derive(Debug)]
pub struct ProgressGate {
    threshold: f64,
    last_notified: f64,
}

impl ProgressGate {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_notified: 0.0,
        }
    }

    /// Report a new percentage. `true` means the caller should notify;
    /// the gate only advances when it says so.
    pub fn accept(&mut self, percent: f64) -> bool {
        if percent - self.last_notified >= self.threshold {
            self.last_notified = percent;
            true
        } else {
            false
        }
    }

    /// Rewind for the next playlist item
    pub fn reset(&mut self) {
        self.last_notified = 0.0;
    }
}
