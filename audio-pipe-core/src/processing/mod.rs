pub mod device_parser;
pub mod probe_parser;
pub mod sample_codec;
