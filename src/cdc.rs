//! Content-defined chunking.
//!
//! A gear hash rolls over the data, and a chunk ends where enough of the hash's low bits are zero.
//! Since the boundaries only depend on the bytes near them, inserting or deleting data only
//! changes the chunks around the edit.
//!
//! Chunking is split in two phases around the target average size. Up to the center point a
//! stricter mask is used, making early cuts unlikely; past it a looser mask makes cuts more
//! likely, pulling chunk sizes toward the average. No chunk is shorter than the minimum size
//! unless the data runs out, and none is longer than the maximum size.
//!
//! There are three ways in:
//!
//! - [`chunks`] for data that's already in memory.
//! - [`Chunker`], an iterator over a [`Read`] source that only buffers a bit past one maximum
//!     chunk size at a time.
//! - [`AsyncChunker`], the same thing for a [`Stream`] of byte buffers.
//!
//! All three yield the same chunks for the same data. Empty data yields a single empty chunk.

use std::fmt;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::{ready, FusedStream, Stream};
use pin_project_lite::pin_project;
use tracing::trace;

use crate::error::{Error, Result};
use crate::gear::GEAR;

/// Default target average chunk size, in bytes.
pub const DEFAULT_AVG_CHUNK_SIZE: usize = 1024;

/// Default size of each read from a stream, in bytes.
pub const DEFAULT_IO_READ_SIZE: usize = 2_097_152;

/// Chunking parameters, all derived from the target average chunk size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CdcParams {
    avg_size: usize,
    min_size: usize,
    max_size: usize,
    center_size: usize,
    mask_s: u64,
    mask_l: u64,
}

impl CdcParams {
    /// Derive the parameters for an average chunk size. Fails for sizes below 2, or so large the
    /// maximum chunk size wouldn't fit in memory.
    pub fn new(avg_size: usize) -> Result<CdcParams> {
        if avg_size < 2 {
            return Err(Error::Range(format!(
                "average chunk size must be at least 2, got {}",
                avg_size
            )));
        }
        let max_size = avg_size
            .checked_mul(8)
            .filter(|m| *m <= isize::MAX as usize)
            .ok_or_else(|| Error::Range(format!("average chunk size {} is too large", avg_size)))?;
        let min_size = avg_size / 4;
        let offset = min_size + min_size.div_ceil(2);
        let center_size = avg_size - offset;
        let bits = (avg_size as f64).log2().round() as u32;
        Ok(CdcParams {
            avg_size,
            min_size,
            max_size,
            center_size,
            mask_s: (1u64 << (bits + 1)) - 1,
            mask_l: (1u64 << (bits - 1)) - 1,
        })
    }

    pub fn avg_size(&self) -> usize {
        self.avg_size
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Where the chunker switches from the strict mask to the loose one.
    pub fn center_size(&self) -> usize {
        self.center_size
    }

    pub fn mask_s(&self) -> u64 {
        self.mask_s
    }

    pub fn mask_l(&self) -> u64 {
        self.mask_l
    }
}

impl Default for CdcParams {
    fn default() -> Self {
        CdcParams {
            avg_size: DEFAULT_AVG_CHUNK_SIZE,
            min_size: 256,
            max_size: 8192,
            center_size: 640,
            mask_s: 2047,
            mask_l: 511,
        }
    }
}

/// Find the end of the first chunk in `buffer`. Never returns more than the buffer length or the
/// maximum chunk size.
pub fn cdc_offset(buffer: &[u8], params: &CdcParams) -> usize {
    let mut pattern: u64 = 0;
    let size = buffer.len();
    let mut i = params.min_size.min(size);

    let barrier = params.center_size.min(size);
    while i < barrier {
        pattern = (pattern >> 1) + GEAR[buffer[i] as usize] as u64;
        if pattern & params.mask_s == 0 {
            return i + 1;
        }
        i += 1;
    }

    let barrier = params.max_size.min(size);
    while i < barrier {
        pattern = (pattern >> 1) + GEAR[buffer[i] as usize] as u64;
        if pattern & params.mask_l == 0 {
            return i + 1;
        }
        i += 1;
    }
    i
}

/// Cut point for the next chunk, rounded down to a multiple of 4 in UTF-32 mode. A cut that
/// would round to zero is left alone.
fn cut_point(buffer: &[u8], params: &CdcParams, utf32: bool) -> usize {
    let cut = cdc_offset(buffer, params).max(1).min(buffer.len());
    if utf32 && cut >= 4 {
        cut - cut % 4
    } else {
        cut
    }
}

/// Chunk data that's already in memory.
pub fn chunks(data: &[u8], utf32: bool, avg_chunk_size: usize) -> Result<Chunks<'_>> {
    Ok(Chunks::new(data, CdcParams::new(avg_chunk_size)?, utf32))
}

/// Iterator over the chunks of an in-memory buffer. See [`chunks`].
#[derive(Clone, Debug)]
pub struct Chunks<'a> {
    data: &'a [u8],
    params: CdcParams,
    utf32: bool,
    emitted: bool,
}

impl<'a> Chunks<'a> {
    pub fn new(data: &'a [u8], params: CdcParams, utf32: bool) -> Self {
        Self {
            data,
            params,
            utf32,
            emitted: false,
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.data.is_empty() {
            if self.emitted {
                return None;
            }
            self.emitted = true;
            return Some(self.data);
        }
        let cut = cut_point(self.data, &self.params, self.utf32);
        let (chunk, rest) = self.data.split_at(cut);
        self.data = rest;
        self.emitted = true;
        Some(chunk)
    }
}

impl<'a> std::iter::FusedIterator for Chunks<'a> {}

/// Buffering shared by the streaming chunkers.
#[derive(Clone, Debug)]
struct ChunkBuffer {
    params: CdcParams,
    utf32: bool,
    buf: Vec<u8>,
    pos: usize,
    emitted: bool,
    done: bool,
}

impl ChunkBuffer {
    fn new(params: CdcParams) -> Self {
        Self {
            params,
            utf32: false,
            buf: Vec::new(),
            pos: 0,
            emitted: false,
            done: false,
        }
    }

    fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True if a cut can't be decided yet without more data.
    fn wants_data(&self) -> bool {
        self.buffered() <= self.params.max_size
    }

    fn extend(&mut self, data: &[u8]) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(data);
    }

    /// Cut the next chunk off the buffer. Only call once enough data is buffered, or the source
    /// is exhausted.
    fn next_chunk(&mut self) -> Option<Vec<u8>> {
        if self.done {
            return None;
        }
        let avail = &self.buf[self.pos..];
        if avail.is_empty() {
            self.done = true;
            if self.emitted {
                return None;
            }
            return Some(Vec::new());
        }
        let cut = cut_point(avail, &self.params, self.utf32);
        let chunk = avail[..cut].to_vec();
        self.pos += cut;
        self.emitted = true;
        trace!(size = cut, buffered = self.buffered(), "chunk boundary");
        Some(chunk)
    }
}

/// Iterator over the chunks of a [`Read`] source.
///
/// Reads happen in blocks of the configured read size, and only as far ahead as needed to see one
/// maximum-size chunk past the current position.
pub struct Chunker<R: Read> {
    reader: R,
    read_size: usize,
    eof: bool,
    inner: ChunkBuffer,
}

impl<R: Read> Chunker<R> {
    pub fn new(reader: R, params: CdcParams) -> Self {
        Self {
            reader,
            read_size: DEFAULT_IO_READ_SIZE,
            eof: false,
            inner: ChunkBuffer::new(params),
        }
    }

    /// Round every cut down to a multiple of 4 bytes, so UTF-32 text is never split inside a
    /// character.
    pub fn utf32(mut self, utf32: bool) -> Self {
        self.inner.utf32 = utf32;
        self
    }

    /// Set how many bytes to request per read. Zero is treated as 1.
    pub fn read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size.max(1);
        self
    }

    pub fn params(&self) -> &CdcParams {
        &self.inner.params
    }

    fn fill(&mut self) -> Result<()> {
        let mut block = vec![0u8; self.read_size];
        while !self.eof && self.inner.wants_data() {
            match self.reader.read(&mut block) {
                Ok(0) => self.eof = true,
                Ok(n) => self.inner.extend(&block[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl<R: Read> fmt::Debug for Chunker<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Chunker")
            .field("read_size", &self.read_size)
            .field("eof", &self.eof)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.inner.done {
            return None;
        }
        if let Err(e) = self.fill() {
            self.inner.done = true;
            return Some(Err(e));
        }
        self.inner.next_chunk().map(Ok)
    }
}

pin_project! {
    /// A stream adapter that chunks a stream of byte buffers.
    ///
    /// This is the asynchronous version of [`Chunker`]. The incoming buffers can be any size; the
    /// chunks come out exactly as they would for the same bytes in one piece.
    #[must_use = "streams do nothing unless polled"]
    pub struct AsyncChunker<St> {
        #[pin]
        stream: St,
        eof: bool,
        inner: ChunkBuffer,
    }
}

impl<St> fmt::Debug for AsyncChunker<St>
where
    St: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AsyncChunker")
            .field("stream", &self.stream)
            .field("eof", &self.eof)
            .field("inner", &self.inner)
            .finish()
    }
}

impl<St, B> AsyncChunker<St>
where
    St: Stream<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    pub fn new(stream: St, params: CdcParams) -> Self {
        Self {
            stream,
            eof: false,
            inner: ChunkBuffer::new(params),
        }
    }

    /// Round every cut down to a multiple of 4 bytes. See [`Chunker::utf32`].
    pub fn utf32(mut self, utf32: bool) -> Self {
        self.inner.utf32 = utf32;
        self
    }
}

impl<St, B> FusedStream for AsyncChunker<St>
where
    St: Stream<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    fn is_terminated(&self) -> bool {
        self.inner.done
    }
}

impl<St, B> Stream for AsyncChunker<St>
where
    St: Stream<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Vec<u8>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Vec<u8>>>> {
        let mut this = self.project();
        if this.inner.done {
            return Poll::Ready(None);
        }
        while !*this.eof && this.inner.wants_data() {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(data)) => this.inner.extend(data.as_ref()),
                Some(Err(e)) => {
                    this.inner.done = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                None => *this.eof = true,
            }
        }
        Poll::Ready(this.inner.next_chunk().map(Ok))
    }
}
