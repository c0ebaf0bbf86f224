//! Scraping of the capture tool's diagnostic output.
//!
//! The capture tool prints device listings and input stream properties to
//! its diagnostic stream in a free-form layout. These parsers pull out what
//! the microphone reader needs and tolerate banner noise around it.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::stream_info::DeviceDescriptor;

/// Marker introducing the audio section of a DirectShow device listing.
pub const AUDIO_SECTION_MARKER: &str = "directshow audio device";

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]+""#).expect("valid quote regex"));

static SAMPLE_RATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+) Hz").expect("valid rate regex"));

struct ListedDevice {
    name: String,
    alternate: String,
}

fn quoted(line: &str) -> Option<&str> {
    QUOTED.find(line).map(|m| {
        let s = m.as_str();
        &s[1..s.len() - 1]
    })
}

/// Parse a device listing into audio devices, in listing order.
///
/// Text before the audio section marker (video devices, version banner) is
/// ignored; without a marker the whole listing is parsed. A line mentioning
/// "alternative name" sets the alternate name of the previous device.
///
/// When a device's name repeats an earlier device's effective name, its
/// alternate name is used instead. A duplicate without an alternate keeps
/// its repeated name.
pub fn parse_device_listing(listing: &str) -> Vec<DeviceDescriptor> {
    // ASCII lowercasing keeps byte offsets valid for slicing the input.
    let section = match listing.to_ascii_lowercase().find(AUDIO_SECTION_MARKER) {
        Some(index) => &listing[index..],
        None => listing,
    };

    let mut listed: Vec<ListedDevice> = Vec::new();
    for line in section.replace("\r\n", "\n").split('\n') {
        let Some(text) = quoted(line) else {
            continue;
        };
        if line.to_ascii_lowercase().contains("alternative name") {
            if let Some(last) = listed.last_mut() {
                last.alternate = text.to_string();
            }
        } else {
            listed.push(ListedDevice {
                name: text.to_string(),
                alternate: String::new(),
            });
        }
    }

    let mut devices: Vec<DeviceDescriptor> = Vec::with_capacity(listed.len());
    for (index, device) in listed.into_iter().enumerate() {
        let duplicate = devices.iter().any(|d| d.name == device.name);
        let name = if duplicate && !device.alternate.is_empty() {
            device.alternate
        } else {
            if duplicate {
                log::warn!("duplicate capture device {:?} has no alternate name", device.name);
            }
            device.name
        };
        devices.push(DeviceDescriptor { index, name });
    }
    devices
}

/// Stream properties reported when the capture tool opens a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureProperties {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Parse the `Stream #` line of the capture tool's input banner, e.g.
/// `Stream #0:0: Audio: pcm_s16le, 44100 Hz, stereo, s16, 1411 kb/s`.
///
/// Sample rate is 0 when not reported; channels default to 2.
pub fn parse_capture_banner(banner: &str) -> CaptureProperties {
    let stream = banner.find("Stream #").map_or(banner, |index| &banner[index..]);

    let sample_rate = SAMPLE_RATE
        .captures(stream)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0);

    let channels = if stream.contains("mono") && !stream.contains("stereo") { 1 } else { 2 };

    CaptureProperties { sample_rate, channels }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DSHOW_LISTING: &str = r#"ffmpeg version N-45279-g6b86dd5... --enable-runtime-cpudetect
  libavutil      51. 74.100 / 51. 74.100
  libavcodec     54. 65.100 / 54. 65.100
  libavformat    54. 31.100 / 54. 31.100
  libavdevice    54.  3.100 / 54.  3.100
  libavfilter     3. 19.102 /  3. 19.102
  libswscale      2.  1.101 /  2.  1.101
  libswresample   0. 16.100 /  0. 16.100
[dshow @ 03ACF580] DirectShow video devices
[dshow @ 03ACF580]  "Integrated Camera"
[dshow @ 03ACF580]  "screen-capture-recorder"
[dshow @ 03ACF580] DirectShow audio devices
[dshow @ 03ACF580]  "Internal Microphone (Conexant 2"
[dshow @ 03ACF580]  "virtual-audio-capturer"
dummy: Immediate exit requested"#;

    fn names(devices: &[DeviceDescriptor]) -> Vec<&str> {
        devices.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn audio_devices_after_marker() {
        let devices = parse_device_listing(DSHOW_LISTING);
        assert_eq!(names(&devices), ["Internal Microphone (Conexant 2", "virtual-audio-capturer"]);
        assert_eq!(devices[1].index, 1);
    }

    #[test]
    fn windows_line_endings() {
        let listing = DSHOW_LISTING.replace('\n', "\r\n");
        assert_eq!(parse_device_listing(&listing).len(), 2);
    }

    #[test]
    fn duplicate_uses_alternate_name() {
        let listing = "[dshow @ 0] DirectShow audio devices\n\
                       [dshow @ 0]  \"Microphone\"\n\
                       [dshow @ 0]     Alternative name \"@device_cm_first\"\n\
                       [dshow @ 0]  \"Microphone\"\n\
                       [dshow @ 0]     Alternative name \"Alt\"\n";
        assert_eq!(names(&parse_device_listing(listing)), ["Microphone", "Alt"]);
    }

    #[test]
    fn duplicate_without_alternate_keeps_name() {
        let listing = "DirectShow audio devices\n\"Mic\"\n\"Mic\"\n";
        assert_eq!(names(&parse_device_listing(listing)), ["Mic", "Mic"]);
    }

    #[test]
    fn missing_marker_parses_everything() {
        let listing = "\"Line In\"\n\"USB Audio\"\n";
        assert_eq!(names(&parse_device_listing(listing)), ["Line In", "USB Audio"]);
    }

    #[test]
    fn alternate_before_any_device_is_ignored() {
        let listing = "Alternative name \"@device\"\n\"Mic\"\n";
        assert_eq!(names(&parse_device_listing(listing)), ["Mic"]);
    }

    #[test]
    fn banner_properties() {
        let banner = "Input #0, dshow, from 'audio=Microphone Array (Realtek High Definition Audio(SST))':\n\
                      Duration: N/A, start: 653436.725000, bitrate: 1411 kb/s\n\
                      Stream #0:0: Audio: pcm_s16le, 44100 Hz, stereo, s16, 1411 kb/s";
        let props = parse_capture_banner(banner);
        assert_eq!(props, CaptureProperties { sample_rate: 44100, channels: 2 });
    }

    #[test]
    fn banner_mono_and_missing_rate() {
        let props = parse_capture_banner("Stream #0:0: Audio: pcm_s16le, 16000 Hz, mono, s16");
        assert_eq!(props.channels, 1);
        assert_eq!(props.sample_rate, 16000);

        let props = parse_capture_banner("no stream here");
        assert_eq!(props, CaptureProperties { sample_rate: 0, channels: 2 });
    }
}
