//! Capture device discovery through the capture tool.
//!
//! Only DirectShow can list devices by name; the other backends address
//! devices by index and need no listing. Stream properties of a device are
//! read from the banner the capture tool prints when it opens the device.

use audio_pipe_core::models::error::PipeError;
use audio_pipe_core::models::stream_info::DeviceDescriptor;
use audio_pipe_core::processing::device_parser::{self, CaptureProperties};

use crate::pipeline::{PipeEnd, ProcessPipeline};
use crate::tools::{CaptureBackend, FFMPEG};

/// Lists capture devices and resolves device indices for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEnumerator {
    backend: CaptureBackend,
}

impl DeviceEnumerator {
    /// Enumerator for the platform's backend.
    pub fn new() -> Result<Self, PipeError> {
        Ok(Self::for_backend(CaptureBackend::current()?))
    }

    pub fn for_backend(backend: CaptureBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> CaptureBackend {
        self.backend
    }

    /// List audio capture devices in the order the tool reports them.
    pub fn list_capture_devices(&self) -> Result<Vec<DeviceDescriptor>, PipeError> {
        if self.backend != CaptureBackend::DirectShow {
            return Err(PipeError::UnsupportedPlatform(format!(
                "device listing is not available through {}",
                self.backend.input_format()
            )));
        }

        // The tool exits with an error after listing; only its output matters.
        let mut pipeline = ProcessPipeline::new(FFMPEG, listing_args(self.backend), PipeEnd::Stderr);
        let listing = pipeline.read_to_string()?;
        pipeline.close()?;

        let devices = device_parser::parse_device_listing(&listing);
        log::debug!("found {} capture device(s)", devices.len());
        Ok(devices)
    }

    /// Input name for the device at `index`, e.g. `0`, `:0` or
    /// `audio=Microphone`.
    pub fn device_input(&self, index: usize) -> Result<String, PipeError> {
        match self.backend {
            CaptureBackend::Pulse => Ok(index.to_string()),
            CaptureBackend::AvFoundation => Ok(format!(":{}", index)),
            CaptureBackend::DirectShow => {
                let devices = self.list_capture_devices()?;
                device_input_from_listing(&devices, index)
            }
        }
    }

    /// Sample rate and channel count the device delivers by default.
    pub fn capture_properties(&self, device_input: &str) -> Result<CaptureProperties, PipeError> {
        let args = ["-hide_banner", "-f", self.backend.input_format(), "-i", device_input];
        let mut pipeline = ProcessPipeline::new(FFMPEG, args, PipeEnd::Stderr);
        // No output file is given, so the tool prints the input banner and exits.
        let banner = pipeline.read_to_string()?;
        pipeline.close()?;

        let properties = device_parser::parse_capture_banner(&banner);
        log::debug!(
            "device {} reports {} Hz, {} channel(s)",
            device_input,
            properties.sample_rate,
            properties.channels
        );
        Ok(properties)
    }
}

pub(crate) fn listing_args(backend: CaptureBackend) -> Vec<String> {
    ["-hide_banner", "-list_devices", "true", "-f", backend.input_format(), "-i", "dummy"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn device_input_from_listing(devices: &[DeviceDescriptor], index: usize) -> Result<String, PipeError> {
    devices
        .get(index)
        .map(|device| format!("audio={}", device.name))
        .ok_or(PipeError::DeviceNotFound(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_based_backends_need_no_listing() {
        let pulse = DeviceEnumerator::for_backend(CaptureBackend::Pulse);
        assert_eq!(pulse.device_input(2).unwrap(), "2");

        let avfoundation = DeviceEnumerator::for_backend(CaptureBackend::AvFoundation);
        assert_eq!(avfoundation.device_input(0).unwrap(), ":0");
    }

    #[test]
    fn listing_only_through_directshow() {
        let pulse = DeviceEnumerator::for_backend(CaptureBackend::Pulse);
        assert!(matches!(pulse.list_capture_devices(), Err(PipeError::UnsupportedPlatform(_))));
    }

    #[test]
    fn directshow_input_uses_device_name() {
        let devices = vec![
            DeviceDescriptor { index: 0, name: "Microphone".into() },
            DeviceDescriptor { index: 1, name: "Line In".into() },
        ];
        assert_eq!(device_input_from_listing(&devices, 1).unwrap(), "audio=Line In");
        assert_eq!(device_input_from_listing(&devices, 2), Err(PipeError::DeviceNotFound(2)));
    }

    #[test]
    fn listing_arguments() {
        assert_eq!(
            listing_args(CaptureBackend::DirectShow).join(" "),
            "-hide_banner -list_devices true -f dshow -i dummy"
        );
    }
}
