//! Stream codec: header, preamble, and the segment loop.
//!
//! Encrypted stream layout:
//! ```text
//! {"version":...,"algorithm":...,"format":...,"kdf":{...}}\n   header line, always raw text
//! [32 bytes: stream salt][7 bytes: nonce prefix]                preamble   ┐ base64 when
//! [segment 0][segment 1]...[segment n, last flag set]          segments   ┘ format = base64
//! ```
//!
//! Interior segments carry exactly `segment_size` plaintext bytes plus a
//! 16-byte tag; the final segment may be shorter, down to a bare tag.

use std::io::{self, BufRead, Read, Write};

use jfcrypt_core::{Algorithm, Format, Header, JfcryptError, JfcryptResult};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::framing::{FramedReader, FramedWriter};
use crate::kdf::{derive_master_key, generate_salt, KdfParams};
use crate::keys::{derive_stream_key, stream_info, StreamPreamble};
use crate::pipeline::SegmentPipeline;
use crate::segment::SegmentCipher;
use crate::TAG_SIZE;

/// Longest header line accepted before giving up on the input.
pub const MAX_HEADER_LEN: u64 = 64 * 1024;

/// Lifecycle of a single encryption or decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecState {
    AwaitingHeader,
    StreamingSegments,
    Done,
    Failed,
}

/// Totals reported once a stream completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub segments: u64,
    pub plaintext_bytes: u64,
}

/// Settings for new streams.
#[derive(Debug, Clone)]
pub struct EncryptOptions {
    pub kdf: KdfParams,
    pub format: Format,
    pub algorithm: Algorithm,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            format: Format::Binary,
            algorithm: Algorithm::Aes256GcmHkdf1Mb,
        }
    }
}

/// Drives one stream through `AwaitingHeader → StreamingSegments → Done`,
/// landing in `Failed` on any error. A codec handles exactly one stream.
#[derive(Debug)]
pub struct StreamCodec {
    state: CodecState,
}

impl Default for StreamCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamCodec {
    pub fn new() -> Self {
        Self {
            state: CodecState::AwaitingHeader,
        }
    }

    pub fn state(&self) -> CodecState {
        self.state
    }

    /// Encrypt `input` to `output` under `passphrase`.
    ///
    /// The header is handed to `output` in a single `write_all`.
    pub fn encrypt<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
        passphrase: &SecretString,
        options: &EncryptOptions,
    ) -> JfcryptResult<StreamStats> {
        self.expect_fresh()?;
        let result = self.run_encrypt(input, output, passphrase, options);
        self.settle(result)
    }

    /// Decrypt `input` to `output`.
    ///
    /// `passphrase` is only called once the header has been parsed and
    /// validated, so malformed input never costs a prompt or a KDF run.
    pub fn decrypt<R, W, P>(
        &mut self,
        input: R,
        output: W,
        passphrase: P,
    ) -> JfcryptResult<StreamStats>
    where
        R: BufRead,
        W: Write,
        P: FnOnce() -> JfcryptResult<SecretString>,
    {
        self.expect_fresh()?;
        let result = self.run_decrypt(input, output, passphrase);
        self.settle(result)
    }

    fn expect_fresh(&self) -> JfcryptResult<()> {
        if self.state != CodecState::AwaitingHeader {
            return Err(JfcryptError::parameter(format!(
                "stream codec already used (state: {:?})",
                self.state
            )));
        }
        Ok(())
    }

    fn transition(&mut self, next: CodecState) {
        debug!(from = ?self.state, to = ?next, "codec state");
        self.state = next;
    }

    fn settle(&mut self, result: JfcryptResult<StreamStats>) -> JfcryptResult<StreamStats> {
        match &result {
            Ok(_) => self.transition(CodecState::Done),
            Err(e) => {
                // reported once by the caller
                debug!(state = ?self.state, error = %e, "stream failed");
                self.transition(CodecState::Failed);
            }
        }
        result
    }

    fn run_encrypt<R: Read, W: Write>(
        &mut self,
        input: R,
        mut output: W,
        passphrase: &SecretString,
        options: &EncryptOptions,
    ) -> JfcryptResult<StreamStats> {
        if passphrase.expose_secret().is_empty() {
            return Err(JfcryptError::passphrase("passphrase cannot be empty"));
        }

        let salt = generate_salt();
        let master = derive_master_key(passphrase, &salt, &options.kdf)?;

        let header = Header::new(options.algorithm, options.format, options.kdf.to_block(&salt));
        output.write_all(&header.to_line()?)?;
        debug!(
            algorithm = %header.algorithm,
            format = %header.format,
            "header written"
        );
        self.transition(CodecState::StreamingSegments);

        let segment_size = options.algorithm.segment_size();
        let preamble = StreamPreamble::generate();
        let key = derive_stream_key(
            &master,
            &preamble.salt,
            &stream_info(options.algorithm, segment_size),
        )?;
        drop(master);
        let cipher = SegmentCipher::new(&key, preamble.nonce_prefix);
        drop(key);

        let mut framed = FramedWriter::new(output, options.format);
        framed.write_all(&preamble.to_bytes())?;
        let stats = encrypt_segments(&cipher, segment_size, input, &mut framed)?;
        framed.finish()?.flush()?;

        info!(
            segments = stats.segments,
            bytes = stats.plaintext_bytes,
            "stream encrypted"
        );
        Ok(stats)
    }

    fn run_decrypt<R, W, P>(
        &mut self,
        mut input: R,
        mut output: W,
        passphrase: P,
    ) -> JfcryptResult<StreamStats>
    where
        R: BufRead,
        W: Write,
        P: FnOnce() -> JfcryptResult<SecretString>,
    {
        let header = read_header(&mut input)?;
        let (algorithm, format) = header.validate()?;
        let salt = header.kdf.decode_salt()?;
        let params = KdfParams::from_block(&header.kdf);
        debug!(
            version = %header.version,
            algorithm = %header.algorithm,
            format = format.as_str(),
            mem_cost_kib = params.mem_cost_kib,
            time_cost = params.time_cost,
            parallelism = params.parallelism,
            "header parsed"
        );

        let passphrase = passphrase()?;
        let master = derive_master_key(&passphrase, &salt, &params)?;
        drop(passphrase);
        self.transition(CodecState::StreamingSegments);

        let mut framed = FramedReader::new(input, format);
        let mut preamble_bytes = [0u8; StreamPreamble::SIZE];
        read_preamble(&mut framed, &mut preamble_bytes)?;
        let preamble = StreamPreamble::from_bytes(&preamble_bytes);

        let segment_size = algorithm.segment_size();
        let key = derive_stream_key(
            &master,
            &preamble.salt,
            &stream_info(algorithm, segment_size),
        )?;
        drop(master);
        let cipher = SegmentCipher::new(&key, preamble.nonce_prefix);
        drop(key);

        let stats = decrypt_segments(&cipher, segment_size, framed, &mut output)?;
        output.flush()?;

        info!(
            segments = stats.segments,
            bytes = stats.plaintext_bytes,
            "stream decrypted"
        );
        Ok(stats)
    }
}

/// Encrypt a whole stream with a fresh codec.
pub fn encrypt_stream<R: Read, W: Write>(
    input: R,
    output: W,
    passphrase: &SecretString,
    options: &EncryptOptions,
) -> JfcryptResult<StreamStats> {
    StreamCodec::new().encrypt(input, output, passphrase, options)
}

/// Decrypt a whole stream with a fresh codec.
pub fn decrypt_stream<R, W, P>(input: R, output: W, passphrase: P) -> JfcryptResult<StreamStats>
where
    R: BufRead,
    W: Write,
    P: FnOnce() -> JfcryptResult<SecretString>,
{
    StreamCodec::new().decrypt(input, output, passphrase)
}

/// Seal `input` segment by segment into `output`.
///
/// Exactly one segment carries the last flag; empty input produces a single
/// empty final segment.
pub fn encrypt_segments<R: Read, W: Write>(
    cipher: &SegmentCipher,
    segment_size: usize,
    input: R,
    output: &mut W,
) -> JfcryptResult<StreamStats> {
    let mut pipeline = SegmentPipeline::new(input, segment_size);
    let mut stats = StreamStats::default();
    let mut index: u32 = 0;

    while let Some(last) = pipeline.advance()? {
        let unit = pipeline.current_mut();
        stats.plaintext_bytes += unit.len() as u64;
        cipher.seal_in_place(index, last, unit)?;
        output.write_all(unit)?;
        stats.segments += 1;
        if last {
            break;
        }
        index = next_index(index)?;
    }
    Ok(stats)
}

/// Open `input` segment by segment into `output`.
///
/// A segment's plaintext is written only after its tag verified. Any
/// authentication failure, truncation, or malformed payload is `Crypto`.
pub fn decrypt_segments<R: Read, W: Write>(
    cipher: &SegmentCipher,
    segment_size: usize,
    input: R,
    output: &mut W,
) -> JfcryptResult<StreamStats> {
    let mut pipeline = SegmentPipeline::new(input, segment_size + TAG_SIZE);
    let mut stats = StreamStats::default();
    let mut index: u32 = 0;

    while let Some(last) = pipeline.advance().map_err(payload_error)? {
        let unit = pipeline.current_mut();
        cipher.open_in_place(index, last, unit)?;
        output.write_all(unit)?;
        stats.plaintext_bytes += unit.len() as u64;
        stats.segments += 1;
        if last {
            break;
        }
        index = next_index(index)?;
    }
    Ok(stats)
}

fn next_index(index: u32) -> JfcryptResult<u32> {
    index
        .checked_add(1)
        .ok_or_else(|| JfcryptError::parameter("stream exceeds 2^32 segments"))
}

/// Read errors on the ciphertext side: undecodable payload is corruption.
fn payload_error(e: io::Error) -> JfcryptError {
    if e.kind() == io::ErrorKind::InvalidData {
        JfcryptError::Crypto
    } else {
        JfcryptError::Io(e)
    }
}

fn read_header<R: BufRead>(input: &mut R) -> JfcryptResult<Header> {
    let mut line = Vec::new();
    input
        .by_ref()
        .take(MAX_HEADER_LEN)
        .read_until(b'\n', &mut line)?;
    if line.last() != Some(&b'\n') {
        return Err(JfcryptError::input_format(
            "failed to read header (is it a valid jfcrypt file?)",
        ));
    }
    Header::parse_line(&line)
}

fn read_preamble<R: Read>(input: &mut R, buf: &mut [u8]) -> JfcryptResult<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => JfcryptError::Crypto,
        _ => payload_error(e),
    })
}
