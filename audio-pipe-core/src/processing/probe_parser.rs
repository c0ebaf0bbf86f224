use crate::models::stream_info::StreamMetadata;

/// Parse the probe tool's compact output into one record per stream.
///
/// Each non-blank line is one elementary stream; fields are separated by
/// `|` and only `key=value` fields are kept (the leading section name has
/// no `=` and is skipped). Within a record the first value for a key wins.
pub fn parse_compact_output(output: &str) -> Vec<StreamMetadata> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut record = StreamMetadata::new();
            for field in line.trim_end_matches('\r').split('|') {
                if let Some((key, value)) = field.split_once('=') {
                    record.insert_first(key, value);
                }
            }
            record
        })
        .collect()
}
