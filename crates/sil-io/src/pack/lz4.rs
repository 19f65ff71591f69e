// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Block-wise LZ4 coding for compressed pack entries.
//!
//! A compressed entry is a sequence of `[u32 LE compressed_len][lz4 block]`
//! frames. Every block decodes to exactly `block_size` bytes, except the last
//! which holds the remainder.

use sil_core::{Decompressor, ResourceError};
use std::io::{self, Read};

const FRAME_HEADER: usize = 4;
const READ_CHUNK: usize = 16 * 1024;

/// Compresses `data` into length-prefixed LZ4 blocks of `block_size` bytes.
pub fn compress_blocks(data: &[u8], block_size: u32) -> Vec<u8> {
    let block_size = block_size.max(1) as usize;
    let mut out = Vec::with_capacity(data.len() / 2 + FRAME_HEADER);
    for chunk in data.chunks(block_size) {
        let block = lz4_flex::block::compress(chunk);
        out.extend_from_slice(&(block.len() as u32).to_le_bytes());
        out.extend_from_slice(&block);
    }
    out
}

/// Incremental decoder for one compressed entry.
#[derive(Debug)]
pub struct Lz4BlockDecompressor {
    size: u64,
    block_size: u32,
    produced: u64,
    pending: Vec<u8>,
}

impl Lz4BlockDecompressor {
    /// Creates a decoder for an entry of `size` decoded bytes.
    pub fn new(size: u64, block_size: u32) -> Self {
        Self {
            size,
            block_size: block_size.max(1),
            produced: 0,
            pending: Vec::new(),
        }
    }

    /// Number of decoded bytes emitted so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    fn decode_ready_frames(&mut self, output: &mut Vec<u8>) -> Result<(), ResourceError> {
        let mut consumed = 0;
        while let Some(header) = self.pending.get(consumed..consumed + FRAME_HEADER) {
            let clen = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
            let start = consumed + FRAME_HEADER;
            let Some(block) = self.pending.get(start..start + clen) else {
                break;
            };

            let remaining = self.size - self.produced;
            let expected = remaining.min(u64::from(self.block_size)) as usize;
            if expected == 0 {
                return Err(ResourceError::DecodeFailed(
                    "trailing data after last block".into(),
                ));
            }

            let at = output.len();
            output.try_reserve(expected)?;
            output.resize(at + expected, 0);
            let written = lz4_flex::block::decompress_into(block, &mut output[at..])
                .map_err(|e| ResourceError::DecodeFailed(e.to_string()))?;
            if written != expected {
                output.truncate(at);
                return Err(ResourceError::DecodeFailed(format!(
                    "block decoded to {written} bytes, expected {expected}"
                )));
            }
            self.produced += expected as u64;
            consumed = start + clen;
        }
        self.pending.drain(..consumed);
        Ok(())
    }
}

impl Decompressor for Lz4BlockDecompressor {
    fn feed(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<(), ResourceError> {
        self.pending.extend_from_slice(input);
        self.decode_ready_frames(output)
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<(), ResourceError> {
        self.decode_ready_frames(output)?;
        if !self.pending.is_empty() || self.produced != self.size {
            return Err(ResourceError::DecodeFailed(format!(
                "compressed stream truncated after {} of {} bytes",
                self.produced, self.size
            )));
        }
        Ok(())
    }
}

/// A [`Read`] adapter that decodes a compressed entry on the fly.
#[derive(Debug)]
pub struct Lz4BlockReader<R> {
    inner: R,
    decoder: Lz4BlockDecompressor,
    scratch: Vec<u8>,
    out: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: Read> Lz4BlockReader<R> {
    /// Wraps a reader producing the stored bytes of an entry.
    pub fn new(inner: R, size: u64, block_size: u32) -> Self {
        Self {
            inner,
            decoder: Lz4BlockDecompressor::new(size, block_size),
            scratch: vec![0; READ_CHUNK],
            out: Vec::new(),
            pos: 0,
            done: false,
        }
    }
}

impl<R: Read> Read for Lz4BlockReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.out.len() {
            if self.done || buf.is_empty() {
                return Ok(0);
            }
            self.out.clear();
            self.pos = 0;
            let n = self.inner.read(&mut self.scratch)?;
            let result = if n == 0 {
                self.done = true;
                self.decoder.finish(&mut self.out)
            } else {
                self.decoder.feed(&self.scratch[..n], &mut self.out)
            };
            result.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
        let n = buf.len().min(self.out.len() - self.pos);
        buf[..n].copy_from_slice(&self.out[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn feeding_byte_by_byte_decodes_everything() {
        let data = sample(1000);
        let packed = compress_blocks(&data, 64);

        let mut decoder = Lz4BlockDecompressor::new(data.len() as u64, 64);
        let mut out = Vec::with_capacity(data.len());
        for byte in &packed {
            decoder.feed(std::slice::from_ref(byte), &mut out).unwrap();
        }
        decoder.finish(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn truncated_stream_fails_on_finish() {
        let data = sample(300);
        let packed = compress_blocks(&data, 100);

        let mut decoder = Lz4BlockDecompressor::new(300, 100);
        let mut out = Vec::new();
        decoder.feed(&packed[..packed.len() - 3], &mut out).unwrap();
        assert!(matches!(
            decoder.finish(&mut out),
            Err(ResourceError::DecodeFailed(_))
        ));
    }

    #[test]
    fn reader_decodes_transparently() {
        let data = sample(70_000);
        let packed = compress_blocks(&data, 4096);
        let mut reader = Lz4BlockReader::new(packed.as_slice(), data.len() as u64, 4096);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn empty_entry_has_no_blocks() {
        assert!(compress_blocks(&[], 16).is_empty());
        let mut decoder = Lz4BlockDecompressor::new(0, 16);
        let mut out = Vec::new();
        decoder.finish(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
