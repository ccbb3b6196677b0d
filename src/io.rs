/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Byte-level primitives and the 118-byte header (`SPEC_FULL.md` §6), plus
//! the chunked I/O driver and `write_full`/`read_full` convenience
//! wrappers.
//!
//! The wire format is a cross-language contract and must not gain any
//! Rust-idiomatic deviation (`SPEC_FULL.md` §6): field offsets, sizes, and
//! order below are transcribed verbatim from `spec.md`.

use crate::error::{GraphError, Result};
use crate::flags::{Endianness, GraphFamily, GraphOptions, GraphVersion};
use log::trace;

pub const HEADER_SIZE: usize = 118;

mod off {
    pub const VERSION: usize = 0;
    pub const ENDIAN: usize = 1;
    pub const NODE_ATTR_SIZE: usize = 2;
    pub const EDGE_ATTR_SIZE: usize = 6;
    pub const OPAQUE: usize = 10;
    pub const OPTIONS: usize = 74;
    pub const FAMILY: usize = 78;
    pub const ACC_COST: usize = 82;
    pub const NODE_COUNT: usize = 90;
    pub const HEAD_COUNT: usize = 94;
    pub const TAIL_COUNT: usize = 98;
    pub const ALONE_COUNT: usize = 102;
    pub const EDGE_COUNT: usize = 106;
    pub const NODE_BUF_SIZE: usize = 110;
    pub const EDGE_BUF_SIZE: usize = 114;
}

pub(crate) fn get_u32(buf: &[u8], offset: usize, e: Endianness) -> u32 {
    let b: [u8; 4] = buf[offset..offset + 4].try_into().expect("4-byte slice");
    match e {
        Endianness::Big => u32::from_be_bytes(b),
        Endianness::Little => u32::from_le_bytes(b),
    }
}

pub(crate) fn put_u32(buf: &mut [u8], offset: usize, value: u32, e: Endianness) {
    let b = match e {
        Endianness::Big => value.to_be_bytes(),
        Endianness::Little => value.to_le_bytes(),
    };
    buf[offset..offset + 4].copy_from_slice(&b);
}

pub(crate) fn get_i32(buf: &[u8], offset: usize, e: Endianness) -> i32 {
    get_u32(buf, offset, e) as i32
}

pub(crate) fn put_i32(buf: &mut [u8], offset: usize, value: i32, e: Endianness) {
    put_u32(buf, offset, value as u32, e)
}

pub(crate) fn get_i64(buf: &[u8], offset: usize, e: Endianness) -> i64 {
    let b: [u8; 8] = buf[offset..offset + 8].try_into().expect("8-byte slice");
    match e {
        Endianness::Big => i64::from_be_bytes(b),
        Endianness::Little => i64::from_le_bytes(b),
    }
}

pub(crate) fn put_i64(buf: &mut [u8], offset: usize, value: i64, e: Endianness) {
    let b = match e {
        Endianness::Big => value.to_be_bytes(),
        Endianness::Little => value.to_le_bytes(),
    };
    buf[offset..offset + 8].copy_from_slice(&b);
}

/// The 118-byte fixed header preceding the node and edge buffers.
#[derive(Debug, Clone)]
pub struct Header {
    pub version: GraphVersion,
    pub endianness: Endianness,
    pub node_attr_size: u32,
    pub edge_attr_size: u32,
    pub opaque: [u32; 16],
    pub options: GraphOptions,
    pub family: GraphFamily,
    pub accumulated_cost: i64,
    pub node_count: u32,
    pub head_count: u32,
    pub tail_count: u32,
    pub alone_count: u32,
    pub edge_count: u32,
    pub node_buffer_size: u32,
    pub edge_buffer_size: u32,
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let e = self.endianness;
        buf[off::VERSION] = self.version.as_byte();
        buf[off::ENDIAN] = self.endianness.as_byte();
        put_u32(&mut buf, off::NODE_ATTR_SIZE, self.node_attr_size, e);
        put_u32(&mut buf, off::EDGE_ATTR_SIZE, self.edge_attr_size, e);
        for (i, w) in self.opaque.iter().enumerate() {
            put_u32(&mut buf, off::OPAQUE + i * 4, *w, e);
        }
        put_u32(&mut buf, off::OPTIONS, self.options.bits(), e);
        put_u32(&mut buf, off::FAMILY, self.family.bits(), e);
        put_i64(&mut buf, off::ACC_COST, self.accumulated_cost, e);
        put_u32(&mut buf, off::NODE_COUNT, self.node_count, e);
        put_u32(&mut buf, off::HEAD_COUNT, self.head_count, e);
        put_u32(&mut buf, off::TAIL_COUNT, self.tail_count, e);
        put_u32(&mut buf, off::ALONE_COUNT, self.alone_count, e);
        put_u32(&mut buf, off::EDGE_COUNT, self.edge_count, e);
        put_u32(&mut buf, off::NODE_BUF_SIZE, self.node_buffer_size, e);
        put_u32(&mut buf, off::EDGE_BUF_SIZE, self.edge_buffer_size, e);
        buf
    }

    /// Decodes a header, producing host-native field values regardless of
    /// the source endianness (`SPEC_FULL.md` §9 "Endianness": swap once on
    /// ingest, host-native thereafter).
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(GraphError::Read);
        }
        let version = GraphVersion::from_byte(buf[off::VERSION]).ok_or(GraphError::BadVersion)?;
        let endianness =
            Endianness::from_byte(buf[off::ENDIAN]).ok_or(GraphError::UnknownByteOrder)?;
        let e = endianness;
        let mut opaque = [0u32; 16];
        for (i, w) in opaque.iter_mut().enumerate() {
            *w = get_u32(buf, off::OPAQUE + i * 4, e);
        }
        Ok(Header {
            version,
            endianness,
            node_attr_size: get_u32(buf, off::NODE_ATTR_SIZE, e),
            edge_attr_size: get_u32(buf, off::EDGE_ATTR_SIZE, e),
            opaque,
            options: GraphOptions::from_bits_truncate(get_u32(buf, off::OPTIONS, e)),
            family: GraphFamily::from_bits_truncate(get_u32(buf, off::FAMILY, e)),
            accumulated_cost: get_i64(buf, off::ACC_COST, e),
            node_count: get_u32(buf, off::NODE_COUNT, e),
            head_count: get_u32(buf, off::HEAD_COUNT, e),
            tail_count: get_u32(buf, off::TAIL_COUNT, e),
            alone_count: get_u32(buf, off::ALONE_COUNT, e),
            edge_count: get_u32(buf, off::EDGE_COUNT, e),
            node_buffer_size: get_u32(buf, off::NODE_BUF_SIZE, e),
            edge_buffer_size: get_u32(buf, off::EDGE_BUF_SIZE, e),
        })
    }
}

/// Renormalizes a buffer of 32-bit words from `source` byte order to host
/// order, in place. A no-op when `source` already matches the host.
pub(crate) fn renormalize_words(buf: &mut [u8], source: Endianness) {
    if source == Endianness::host() {
        return;
    }
    let mut i = 0;
    while i + 4 <= buf.len() {
        let v = get_u32(buf, i, source);
        put_u32(buf, i, v, Endianness::host());
        i += 4;
    }
}

/// The phase of a chunked I/O transfer (`SPEC_FULL.md` §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoPhase {
    Begin,
    Header,
    NodeBuffer,
    EdgeBuffer,
    End,
}

/// Drives a write of `HEADER ‖ NODE_BUFFER ‖ EDGE_BUFFER` in caller-sized
/// chunks.
pub struct ChunkedWriter<'a> {
    header: [u8; HEADER_SIZE],
    node_bytes: &'a [u8],
    edge_bytes: &'a [u8],
    phase: IoPhase,
    offset: usize,
}

impl<'a> ChunkedWriter<'a> {
    pub fn new(header: Header, node_bytes: &'a [u8], edge_bytes: &'a [u8]) -> Self {
        Self {
            header: header.encode(),
            node_bytes,
            edge_bytes,
            phase: IoPhase::Begin,
            offset: 0,
        }
    }

    pub fn phase(&self) -> IoPhase {
        self.phase
    }

    fn current_region(&self) -> &[u8] {
        match self.phase {
            IoPhase::Header => &self.header,
            IoPhase::NodeBuffer => self.node_bytes,
            IoPhase::EdgeBuffer => self.edge_bytes,
            IoPhase::Begin | IoPhase::End => &[],
        }
    }

    /// Copies up to `buf.len()` bytes into `buf`, advancing the phase as
    /// regions are exhausted. Returns the number of bytes written, `0`
    /// once the stream is exhausted.
    pub fn next_chunk(&mut self, buf: &mut [u8]) -> usize {
        if self.phase == IoPhase::Begin {
            self.phase = IoPhase::Header;
            trace!("chunked write: BEGIN -> HEADER");
        }
        let mut written = 0;
        while written < buf.len() && self.phase != IoPhase::End {
            let region = self.current_region();
            let remaining = region.len() - self.offset;
            if remaining == 0 {
                self.advance_phase();
                continue;
            }
            let n = remaining.min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&region[self.offset..self.offset + n]);
            self.offset += n;
            written += n;
        }
        written
    }

    fn advance_phase(&mut self) {
        self.offset = 0;
        self.phase = match self.phase {
            IoPhase::Header => IoPhase::NodeBuffer,
            IoPhase::NodeBuffer => IoPhase::EdgeBuffer,
            IoPhase::EdgeBuffer => IoPhase::End,
            other => other,
        };
        trace!("chunked write: advancing to {:?}", self.phase);
    }
}

/// Drives a read of `HEADER ‖ NODE_BUFFER ‖ EDGE_BUFFER` from caller-sized
/// chunks, byte-swapping node/edge words if the header's endianness
/// disagrees with the host.
pub struct ChunkedReader {
    phase: IoPhase,
    header_buf: Vec<u8>,
    header: Option<Header>,
    node_bytes: Vec<u8>,
    edge_bytes: Vec<u8>,
    node_remaining: usize,
    edge_remaining: usize,
}

impl Default for ChunkedReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedReader {
    pub fn new() -> Self {
        Self {
            phase: IoPhase::Begin,
            header_buf: Vec::with_capacity(HEADER_SIZE),
            header: None,
            node_bytes: Vec::new(),
            edge_bytes: Vec::new(),
            node_remaining: 0,
            edge_remaining: 0,
        }
    }

    pub fn phase(&self) -> IoPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == IoPhase::End
    }

    /// Feeds the next chunk of source bytes into the reader.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        if self.phase == IoPhase::Begin {
            self.phase = IoPhase::Header;
            trace!("chunked read: BEGIN -> HEADER");
        }
        let mut pos = 0;
        while pos < chunk.len() {
            match self.phase {
                IoPhase::Header => {
                    let need = HEADER_SIZE - self.header_buf.len();
                    let take = need.min(chunk.len() - pos);
                    self.header_buf.extend_from_slice(&chunk[pos..pos + take]);
                    pos += take;
                    if self.header_buf.len() == HEADER_SIZE {
                        let header = Header::decode(&self.header_buf)?;
                        self.node_remaining = header.node_buffer_size as usize;
                        self.edge_remaining = header.edge_buffer_size as usize;
                        self.node_bytes.reserve(self.node_remaining);
                        self.edge_bytes.reserve(self.edge_remaining);
                        self.header = Some(header);
                        self.phase = IoPhase::NodeBuffer;
                        trace!("chunked read: HEADER -> NODEBUFFER");
                    }
                }
                IoPhase::NodeBuffer => {
                    let take = self.node_remaining.min(chunk.len() - pos);
                    self.node_bytes.extend_from_slice(&chunk[pos..pos + take]);
                    self.node_remaining -= take;
                    pos += take;
                    if self.node_remaining == 0 {
                        self.phase = IoPhase::EdgeBuffer;
                        trace!("chunked read: NODEBUFFER -> EDGEBUFFER");
                    }
                }
                IoPhase::EdgeBuffer => {
                    let take = self.edge_remaining.min(chunk.len() - pos);
                    self.edge_bytes.extend_from_slice(&chunk[pos..pos + take]);
                    self.edge_remaining -= take;
                    pos += take;
                    if self.edge_remaining == 0 {
                        self.phase = IoPhase::End;
                        trace!("chunked read: EDGEBUFFER -> END");
                    }
                }
                IoPhase::Begin | IoPhase::End => break,
            }
        }
        Ok(())
    }

    /// Consumes the reader once `is_done()`, returning the decoded header
    /// and host-normalized node/edge buffers.
    pub fn finish(mut self) -> Result<(Header, Vec<u8>, Vec<u8>)> {
        if !self.is_done() {
            return Err(GraphError::Read);
        }
        let header = self.header.take().ok_or(GraphError::Read)?;
        renormalize_words(&mut self.node_bytes, header.endianness);
        renormalize_words(&mut self.edge_bytes, header.endianness);
        let mut header = header;
        header.endianness = Endianness::host();
        Ok((header, self.node_bytes, self.edge_bytes))
    }
}

/// Writes the full byte image (header + buffers) to `sink` in one call,
/// driving [`ChunkedWriter`] with an internal buffer.
pub fn write_full<W: std::io::Write>(
    header: Header,
    node_bytes: &[u8],
    edge_bytes: &[u8],
    sink: &mut W,
) -> Result<()> {
    let mut writer = ChunkedWriter::new(header, node_bytes, edge_bytes);
    let mut chunk = [0u8; 4096];
    loop {
        let n = writer.next_chunk(&mut chunk);
        if n == 0 {
            break;
        }
        sink.write_all(&chunk[..n]).map_err(|_| GraphError::Write)?;
    }
    Ok(())
}

/// Reads a full byte image from `source`, driving [`ChunkedReader`] with
/// an internal buffer.
pub fn read_full<R: std::io::Read>(source: &mut R) -> Result<(Header, Vec<u8>, Vec<u8>)> {
    let mut reader = ChunkedReader::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = source.read(&mut chunk).map_err(|_| GraphError::Read)?;
        if n == 0 {
            break;
        }
        reader.feed(&chunk[..n])?;
        if reader.is_done() {
            break;
        }
    }
    reader.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            version: GraphVersion::V2,
            endianness: Endianness::Little,
            node_attr_size: 4,
            edge_attr_size: 0,
            opaque: [0; 16],
            options: GraphOptions::empty(),
            family: GraphFamily::empty(),
            accumulated_cost: -12345,
            node_count: 3,
            head_count: 2,
            tail_count: 2,
            alone_count: 0,
            edge_count: 2,
            node_buffer_size: 100,
            edge_buffer_size: 200,
        }
    }

    #[test]
    fn header_round_trips_same_endianness() {
        let h = sample_header();
        let bytes = h.encode();
        let decoded = Header::decode(&bytes).unwrap();
        assert_eq!(decoded.node_count, 3);
        assert_eq!(decoded.accumulated_cost, -12345);
        assert_eq!(decoded.edge_buffer_size, 200);
    }

    #[test]
    fn header_round_trips_across_endianness() {
        let mut h = sample_header();
        h.endianness = Endianness::Big;
        let bytes = h.encode();
        let decoded = Header::decode(&bytes).unwrap();
        assert_eq!(decoded.node_count, 3);
        assert_eq!(decoded.accumulated_cost, -12345);
    }

    #[test]
    fn chunked_write_then_read_small_buffer() {
        let node_bytes = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let edge_bytes = vec![9u8, 10, 11, 12];
        let mut h = sample_header();
        h.node_buffer_size = node_bytes.len() as u32;
        h.edge_buffer_size = edge_bytes.len() as u32;

        let mut out = Vec::new();
        write_full(h.clone(), &node_bytes, &edge_bytes, &mut out).unwrap();
        assert_eq!(out.len(), HEADER_SIZE + node_bytes.len() + edge_bytes.len());

        let mut cursor = std::io::Cursor::new(out);
        let (decoded, n, e) = read_full(&mut cursor).unwrap();
        assert_eq!(n, node_bytes);
        assert_eq!(e, edge_bytes);
        assert_eq!(decoded.node_count, 3);
    }
}
