use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Fjall keyspace holding Task/Result records
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            store_path: default_store_path(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/store")
}

/// External downloader process configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    /// Path to the downloader binary (yt-dlp / youtube-dl compatible)
    #[serde(default = "default_binary_path")]
    pub binary_path: PathBuf,
    /// Path to the transcoder binary passed via --ffmpeg-location
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// Root directory under which per-owner/per-task download folders live
    #[serde(default = "default_download_root")]
    pub download_root: PathBuf,
    /// Titles are truncated to this many characters in stored file names
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    /// Minimum percentage-point gain between two progress notifications
    #[serde(default = "default_progress_threshold")]
    pub progress_threshold: f64,
    /// Idle sleep of the metadata-gathering scheduler loop
    #[serde(default = "default_poll_seconds")]
    pub metadata_poll_seconds: u64,
    /// Idle sleep of the main download scheduler loop
    #[serde(default = "default_poll_seconds")]
    pub download_poll_seconds: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            ffmpeg_path: default_ffmpeg_path(),
            download_root: default_download_root(),
            max_title_length: default_max_title_length(),
            progress_threshold: default_progress_threshold(),
            metadata_poll_seconds: default_poll_seconds(),
            download_poll_seconds: default_poll_seconds(),
        }
    }
}

fn default_binary_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_download_root() -> PathBuf {
    PathBuf::from("data/downloads")
}

fn default_max_title_length() -> usize {
    100
}

fn default_progress_threshold() -> f64 {
    10.0
}

fn default_poll_seconds() -> u64 {
    5
}

/// Push notification delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
        }
    }
}

/// Download directory cleanup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    #[serde(default = "default_retry_attempts")]
    pub delete_retry_attempts: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            delete_retry_attempts: default_retry_attempts(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.downloader.max_title_length, 100);
        assert_eq!(config.downloader.progress_threshold, 10.0);
        assert_eq!(config.notify.retry_attempts, 5);
        assert_eq!(config.cleanup.delete_retry_attempts, 5);
    }
}
