//! Sample format catalog.
//!
//! Validates the sample format tokens understood by the external tools
//! (`u8`, `s16le`, `f64be`, ...) and derives the byte width of one sample.
//! Short tokens without an endianness suffix are completed with the host's
//! native byte order, except for the two 8-bit forms which carry none.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::error::PipeError;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([usf])(\d{1,2})([lb]e)?$").expect("valid format regex"));

static WIDTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}").expect("valid width regex"));

/// Numeric interpretation of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    Unsigned,
    Signed,
    Float,
}

impl SampleKind {
    fn letter(self) -> char {
        match self {
            Self::Unsigned => 'u',
            Self::Signed => 's',
            Self::Float => 'f',
        }
    }
}

/// Byte order of multi-byte samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the machine this code runs on.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Little => "le",
            Self::Big => "be",
        }
    }
}

/// A validated raw sample format.
///
/// Invariants: 8-bit formats are integer and have no endianness; 16/24/32-bit
/// integer and 32/64-bit float formats always have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    kind: SampleKind,
    bits: u8,
    endianness: Option<Endianness>,
}

impl AudioFormat {
    /// Signed 16-bit samples in host byte order, the default for readers.
    pub const fn native_s16() -> Self {
        Self {
            kind: SampleKind::Signed,
            bits: 16,
            endianness: Some(Endianness::native()),
        }
    }

    /// Parse a fully qualified tool token such as `s16le` or `u8`.
    ///
    /// Tokens wider than 8 bits must name their endianness.
    pub fn parse(token: &str) -> Result<Self, PipeError> {
        let unsupported = || PipeError::UnsupportedFormat(token.to_string());

        let caps = TOKEN.captures(token).ok_or_else(unsupported)?;
        let kind = match &caps[1] {
            "u" => SampleKind::Unsigned,
            "s" => SampleKind::Signed,
            _ => SampleKind::Float,
        };
        let bits: u8 = caps[2].parse().map_err(|_| unsupported())?;
        let endianness = caps.get(3).map(|m| match m.as_str() {
            "le" => Endianness::Little,
            _ => Endianness::Big,
        });

        let valid = match (kind, bits) {
            (SampleKind::Unsigned | SampleKind::Signed, 8) => endianness.is_none(),
            (SampleKind::Unsigned | SampleKind::Signed, 16 | 24 | 32) => endianness.is_some(),
            (SampleKind::Float, 32 | 64) => endianness.is_some(),
            _ => false,
        };
        if !valid {
            return Err(unsupported());
        }

        Ok(Self { kind, bits, endianness })
    }

    /// Accept a user-facing token (`s16`, `f32`, `u8`, or an already
    /// qualified `s16be`) and complete it with `host` byte order.
    ///
    /// A token that already ends in `le`/`be` is validated as-is and never
    /// suffixed a second time.
    pub fn normalize(token: &str, host: Endianness) -> Result<Self, PipeError> {
        let token = token.trim();
        if token.ends_with("le") || token.ends_with("be") || token == "u8" || token == "s8" {
            return Self::parse(token);
        }
        Self::parse(&format!("{}{}", token, host.suffix()))
            .map_err(|_| PipeError::UnsupportedFormat(token.to_string()))
    }

    /// [`AudioFormat::normalize`] against the host byte order.
    pub fn normalize_native(token: &str) -> Result<Self, PipeError> {
        Self::normalize(token, Endianness::native())
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    pub fn bits_per_sample(&self) -> usize {
        self.bits as usize
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bits as usize / 8
    }

    /// `None` for 8-bit formats.
    pub fn endianness(&self) -> Option<Endianness> {
        self.endianness
    }

    /// True when samples can be interpreted without byte swapping.
    pub fn is_native_order(&self) -> bool {
        self.endianness.is_none_or(|e| e == Endianness::native())
    }

    /// Token without the endianness suffix, e.g. `s16`.
    pub fn short_name(&self) -> String {
        format!("{}{}", self.kind.letter(), self.bits)
    }

    /// Fully qualified token passed to the tools, e.g. `s16le`.
    pub fn token(&self) -> String {
        match self.endianness {
            Some(e) => format!("{}{}", self.short_name(), e.suffix()),
            None => self.short_name(),
        }
    }

    /// Raw PCM codec name matching this format, e.g. `pcm_s16le`.
    pub fn pcm_codec(&self) -> String {
        format!("pcm_{}", self.token())
    }

    /// Bytes in one interleaved frame of `channels` samples.
    pub fn frame_size(&self, channels: usize) -> usize {
        self.bytes_per_sample() * channels
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::native_s16()
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

impl FromStr for AudioFormat {
    type Err = PipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Bit width named in a format token (`"s24le"` -> 24).
pub fn bits_per_sample(token: &str) -> Result<usize, PipeError> {
    WIDTH
        .find(token)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| PipeError::UnsupportedFormat(token.to_string()))
}
