//! Payload framing: raw bytes or standard base64 after the header line.
//!
//! The header line itself is never encoded. Base64 output ends with a single
//! newline; on input every `\n` and `\r` in the payload is dropped before
//! decoding, so wrapped lines and terminal-appended newlines are tolerated.

use std::io::{self, Read, Write};

use base64::engine::general_purpose::{GeneralPurpose, STANDARD};
use base64::read::DecoderReader;
use base64::write::EncoderWriter;
use jfcrypt_core::Format;

/// Writer side of the payload framing.
pub enum FramedWriter<W: Write> {
    Binary(W),
    Base64(EncoderWriter<'static, GeneralPurpose, W>),
}

impl<W: Write> FramedWriter<W> {
    pub fn new(inner: W, format: Format) -> Self {
        match format {
            Format::Binary => FramedWriter::Binary(inner),
            Format::Base64 => FramedWriter::Base64(EncoderWriter::new(inner, &STANDARD)),
        }
    }

    /// Flush pending output (base64 padding plus the trailing newline) and
    /// return the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            FramedWriter::Binary(inner) => Ok(inner),
            FramedWriter::Base64(mut encoder) => {
                let mut inner = encoder.finish()?;
                inner.write_all(b"\n")?;
                Ok(inner)
            }
        }
    }
}

impl<W: Write> Write for FramedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FramedWriter::Binary(inner) => inner.write(buf),
            FramedWriter::Base64(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FramedWriter::Binary(inner) => inner.flush(),
            FramedWriter::Base64(encoder) => encoder.flush(),
        }
    }
}

/// Reader side of the payload framing.
///
/// Invalid base64 surfaces as an [`io::ErrorKind::InvalidData`] error.
pub enum FramedReader<R: Read> {
    Binary(R),
    Base64(DecoderReader<'static, GeneralPurpose, LineBreakStripper<R>>),
}

impl<R: Read> FramedReader<R> {
    pub fn new(inner: R, format: Format) -> Self {
        match format {
            Format::Binary => FramedReader::Binary(inner),
            Format::Base64 => {
                FramedReader::Base64(DecoderReader::new(LineBreakStripper::new(inner), &STANDARD))
            }
        }
    }
}

impl<R: Read> Read for FramedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FramedReader::Binary(inner) => inner.read(buf),
            FramedReader::Base64(decoder) => decoder.read(buf),
        }
    }
}

/// Drops `\n` and `\r` bytes from the wrapped reader.
pub struct LineBreakStripper<R> {
    inner: R,
}

impl<R: Read> LineBreakStripper<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for LineBreakStripper<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                let b = buf[i];
                if b != b'\n' && b != b'\r' {
                    buf[kept] = b;
                    kept += 1;
                }
            }
            // A read of nothing but line breaks must not look like EOF.
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}
