//! Command-line assembly for the external downloader binary

use crate::store::{QualityTier, Task};
use std::path::Path;

/// Arguments for the metadata-gathering pass: one JSON document per
/// discovered item on stdout, errors on stderr.
pub fn metadata_args(url: &str) -> Vec<String> {
    vec![
        "--no-call-home".to_string(),
        "--dump-json".to_string(),
        "--ignore-errors".to_string(),
        url.to_string(),
    ]
}

/// Arguments for the main download pass
///
/// Audio extraction wins over video selection when both are requested;
/// with neither format set no format flags are added at all and the
/// binary picks its own default. The URL always goes last.
pub fn download_args(task: &Task, ffmpeg_path: &Path, output_template: &str) -> Vec<String> {
    let mut args = vec![
        "--no-call-home".to_string(),
        "--ignore-errors".to_string(),
        "--restrict-filenames".to_string(),
        "--ffmpeg-location".to_string(),
        ffmpeg_path.display().to_string(),
        "-o".to_string(),
        output_template.to_string(),
    ];

    if let Some(audio) = task.audio_format.as_arg() {
        args.push("-x".to_string());
        args.push("--audio-format".to_string());
        args.push(audio.to_string());
    } else if let Some(video) = task.video_format.as_arg() {
        args.push("-f".to_string());
        args.push(
            match task.quality {
                QualityTier::Best => "best",
                QualityTier::BestSplit => "bestvideo+bestaudio/best",
            }
            .to_string(),
        );
        args.push("--recode-video".to_string());
        args.push(video.to_string());
    }

    args.push(task.url.clone());
    args
}
