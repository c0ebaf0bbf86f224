//! Zero-copy conversion between raw byte buffers and typed sample views.
//!
//! A typed view aliases the bytes it was made from. Values are read in host
//! byte order; when a format's endianness differs from the host the caller
//! has to swap bytes before interpreting them. 24-bit formats have no typed
//! equivalent and are handed back as plain bytes.
//!
//! All reinterpretation goes through `bytemuck`, so the length and alignment
//! checks live in one place. [`SampleBuffer`] keeps its bytes in 8-byte
//! aligned storage, which makes every view over it valid.

use std::fmt;

use bytemuck::Pod;

use crate::models::error::PipeError;
use crate::models::format::{AudioFormat, SampleKind};

/// Owned byte buffer with storage aligned for any supported sample type.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SampleBuffer {
    words: Vec<u64>,
    len: usize,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer of `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Copy `bytes` into aligned storage.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buffer = Self::zeroed(bytes.len());
        buffer.as_bytes_mut().copy_from_slice(bytes);
        buffer
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        let bytes: &[u8] = bytemuck::cast_slice(&self.words);
        &bytes[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
        &mut bytes[..self.len]
    }

    /// Shorten the logical length; capacity is kept.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    /// Fails unless the length is a whole number of `frame_size` frames.
    pub fn check_alignment(&self, frame_size: usize) -> Result<(), PipeError> {
        check_alignment(self.len, frame_size)
    }
}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer").field("len", &self.len).finish()
    }
}

impl From<&[u8]> for SampleBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for SampleBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(&bytes)
    }
}

/// Fails unless `len` is a multiple of a non-zero `frame_size`.
pub fn check_alignment(len: usize, frame_size: usize) -> Result<(), PipeError> {
    if frame_size == 0 || len % frame_size != 0 {
        return Err(PipeError::BufferMisaligned { len, frame: frame_size });
    }
    Ok(())
}

/// Typed view over interleaved samples, one variant per supported element type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Samples<'a> {
    U8(&'a [u8]),
    I8(&'a [i8]),
    U16(&'a [u16]),
    I16(&'a [i16]),
    U32(&'a [u32]),
    I32(&'a [i32]),
    F32(&'a [f32]),
    F64(&'a [f64]),
}

impl<'a> Samples<'a> {
    /// Number of samples (not bytes).
    pub fn len(&self) -> usize {
        match self {
            Self::U8(s) => s.len(),
            Self::I8(s) => s.len(),
            Self::U16(s) => s.len(),
            Self::I16(s) => s.len(),
            Self::U32(s) => s.len(),
            Self::I32(s) => s.len(),
            Self::F32(s) => s.len(),
            Self::F64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::U8(_) => ElementType::U8,
            Self::I8(_) => ElementType::I8,
            Self::U16(_) => ElementType::U16,
            Self::I16(_) => ElementType::I16,
            Self::U32(_) => ElementType::U32,
            Self::I32(_) => ElementType::I32,
            Self::F32(_) => ElementType::F32,
            Self::F64(_) => ElementType::F64,
        }
    }

    pub fn element_name(&self) -> &'static str {
        self.element_type().name()
    }

    /// Byte view aliasing the same storage.
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Self::U8(s) => s,
            Self::I8(s) => bytemuck::cast_slice(s),
            Self::U16(s) => bytemuck::cast_slice(s),
            Self::I16(s) => bytemuck::cast_slice(s),
            Self::U32(s) => bytemuck::cast_slice(s),
            Self::I32(s) => bytemuck::cast_slice(s),
            Self::F32(s) => bytemuck::cast_slice(s),
            Self::F64(s) => bytemuck::cast_slice(s),
        }
    }
}

macro_rules! impl_from_slice {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a [$ty]> for Samples<'a> {
                fn from(samples: &'a [$ty]) -> Self {
                    Self::$variant(samples)
                }
            }
        )*
    };
}

impl_from_slice!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
    f64 => F64,
);

/// Element type of a [`Samples`] view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl ElementType {
    /// Element type a view over `format` uses. 24-bit formats stay bytes.
    pub fn for_format(format: &AudioFormat) -> Self {
        match (format.kind(), format.bits_per_sample()) {
            (SampleKind::Signed, 8) => Self::I8,
            (SampleKind::Unsigned, 16) => Self::U16,
            (SampleKind::Signed, 16) => Self::I16,
            (SampleKind::Unsigned, 32) => Self::U32,
            (SampleKind::Signed, 32) => Self::I32,
            (SampleKind::Float, 32) => Self::F32,
            (SampleKind::Float, 64) => Self::F64,
            _ => Self::U8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

fn cast<T: Pod>(buffer: &[u8]) -> Result<&[T], PipeError> {
    bytemuck::try_cast_slice(buffer).map_err(|_| PipeError::BufferMisaligned {
        len: buffer.len(),
        frame: std::mem::size_of::<T>(),
    })
}

/// Alias `buffer` as `count` samples of `format` without copying.
///
/// `count * bytes_per_sample` must equal `buffer.len()`. 24-bit formats are
/// returned as [`Samples::U8`] over the unchanged buffer.
pub fn bytes_to_samples<'a>(
    buffer: &'a [u8],
    count: usize,
    format: &AudioFormat,
) -> Result<Samples<'a>, PipeError> {
    let width = format.bytes_per_sample();
    if count.checked_mul(width) != Some(buffer.len()) {
        return Err(PipeError::BufferMisaligned {
            len: buffer.len(),
            frame: width,
        });
    }

    let samples = match ElementType::for_format(format) {
        ElementType::U8 => Samples::U8(buffer),
        ElementType::I8 => Samples::I8(cast(buffer)?),
        ElementType::U16 => Samples::U16(cast(buffer)?),
        ElementType::I16 => Samples::I16(cast(buffer)?),
        ElementType::U32 => Samples::U32(cast(buffer)?),
        ElementType::I32 => Samples::I32(cast(buffer)?),
        ElementType::F32 => Samples::F32(cast(buffer)?),
        ElementType::F64 => Samples::F64(cast(buffer)?),
    };
    Ok(samples)
}

/// Byte view aliasing `samples`.
pub fn samples_to_bytes(samples: Samples<'_>) -> &[u8] {
    samples.as_bytes()
}

/// Byte view aliasing `samples`, checked against the element type `format`
/// maps to.
pub fn samples_to_bytes_for<'a>(samples: Samples<'a>, format: &AudioFormat) -> Result<&'a [u8], PipeError> {
    let expected = ElementType::for_format(format);
    if samples.element_type() != expected {
        return Err(PipeError::InvalidSampleType {
            expected: expected.name().to_string(),
            actual: samples.element_name().to_string(),
        });
    }
    Ok(samples.as_bytes())
}
