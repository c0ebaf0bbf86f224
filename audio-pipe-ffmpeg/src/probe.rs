//! Stream metadata via the probe tool's compact output.

use audio_pipe_core::models::error::PipeError;
use audio_pipe_core::models::stream_info::{StreamClass, StreamMetadata};
use audio_pipe_core::processing::probe_parser;

use crate::pipeline::{PipeEnd, ProcessPipeline};
use crate::tools::FFPROBE;

pub(crate) fn probe_args(target: &str, class: StreamClass) -> Vec<String> {
    [
        "-show_streams",
        "-select_streams",
        class.selector(),
        "-print_format",
        "compact",
        "-loglevel",
        "quiet",
        target,
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// One metadata record per stream of `class` in `target`, in file order.
///
/// An empty list means the file has no such streams; deciding whether that
/// is an error is up to the caller.
pub fn probe(target: &str, class: StreamClass) -> Result<Vec<StreamMetadata>, PipeError> {
    let mut pipeline = ProcessPipeline::new(FFPROBE, probe_args(target, class), PipeEnd::Stdout);
    // Drain before waiting so a full pipe cannot stall the tool.
    let output = pipeline.read_to_string()?;
    let status = pipeline.close()?;

    if let Some(status) = status.filter(|s| !s.success()) {
        return Err(PipeError::tool_failed(FFPROBE, format!("probing {} exited with {}", target, status)));
    }
    Ok(probe_parser::parse_compact_output(&output))
}

/// True when `target` has at least one non-audio stream. Classes are probed
/// in the order video, subtitle, data, attachment and probing stops at the
/// first hit.
pub fn has_non_audio_streams(target: &str) -> Result<bool, PipeError> {
    for class in StreamClass::NON_AUDIO {
        if !probe(target, class)?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_select_the_stream_class() {
        let args = probe_args("song.mp3", StreamClass::Audio);
        assert_eq!(
            args,
            [
                "-show_streams",
                "-select_streams",
                "a",
                "-print_format",
                "compact",
                "-loglevel",
                "quiet",
                "song.mp3"
            ]
        );
        assert_eq!(probe_args("movie.mp4", StreamClass::Attachment)[2], "t");
    }
}
