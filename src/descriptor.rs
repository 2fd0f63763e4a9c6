//! Fixed-width binary descriptors and the two read paths over them.
//!
//! A [`Descriptor`] is exactly 512 bits stored as eight `u64` words. It is
//! `#[repr(C, align(64))]`, so a `&[Descriptor]` is a run of contiguous 64-byte
//! records with no padding between them, which is also the raw byte layout
//! accepted by [`DescriptorSet::from_bytes`].
//!
//! # Access paths
//!
//! The two sides of a matching invocation are read very differently:
//!
//! | Side    | View           | Pattern |
//! |---------|----------------|---------|
//! | queries | [`CachedView`] | random, revisited by every worker that sweeps part of the train set |
//! | train   | [`LinearView`] | strictly sequential, one pass per query block |
//!
//! `CachedView` hands out descriptors by value so a worker can stage the
//! queries it owns into local (register/L1 resident) storage once and reuse
//! them for its whole slice. `LinearView` only exposes in-order iteration
//! over contiguous index ranges.

use std::fmt;
use std::io::{Read, Write};
use std::ops::Range;

use crate::error::{MatchError, Result};

/// Bits per descriptor.
pub const DESCRIPTOR_BITS: usize = 512;
/// 64-bit words per descriptor.
pub const DESCRIPTOR_WORDS: usize = DESCRIPTOR_BITS / 64;
/// Bytes per descriptor record.
pub const DESCRIPTOR_BYTES: usize = DESCRIPTOR_BITS / 8;

/// An immutable 512-bit binary feature descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C, align(64))]
pub struct Descriptor {
    words: [u64; DESCRIPTOR_WORDS],
}

const _: () = assert!(std::mem::size_of::<Descriptor>() == DESCRIPTOR_BYTES);

impl Descriptor {
    /// All bits clear.
    pub const ZERO: Self = Self {
        words: [0; DESCRIPTOR_WORDS],
    };

    /// All bits set.
    pub const ONES: Self = Self {
        words: [u64::MAX; DESCRIPTOR_WORDS],
    };

    #[inline]
    #[must_use]
    pub const fn from_words(words: [u64; DESCRIPTOR_WORDS]) -> Self {
        Self { words }
    }

    /// Build from one 64-byte record, little-endian per word.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8; DESCRIPTOR_BYTES]) -> Self {
        let mut words = [0u64; DESCRIPTOR_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }
        Self { words }
    }

    #[inline]
    #[must_use]
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_BYTES] {
        let mut bytes = [0u8; DESCRIPTOR_BYTES];
        for (chunk, word) in bytes.chunks_exact_mut(8).zip(self.words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    #[inline]
    #[must_use]
    pub const fn words(&self) -> &[u64; DESCRIPTOR_WORDS] {
        &self.words
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Value of bit `bit` (0..512), counting from the low bit of word 0.
    #[inline]
    #[must_use]
    pub fn bit(&self, bit: usize) -> bool {
        (self.words[bit / 64] >> (bit % 64)) & 1 == 1
    }

    /// Copy with bit `bit` inverted.
    #[inline]
    #[must_use]
    pub fn with_bit_flipped(mut self, bit: usize) -> Self {
        self.words[bit / 64] ^= 1u64 << (bit % 64);
        self
    }

    /// Descriptor whose lowest `n` bits are set (`n` clamped to 512).
    ///
    /// Its Hamming distance to [`Descriptor::ZERO`] is exactly `n`, which makes
    /// it convenient for building inputs with known distances.
    #[must_use]
    pub fn with_low_bits(n: usize) -> Self {
        let n = n.min(DESCRIPTOR_BITS);
        let mut words = [0u64; DESCRIPTOR_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            let lo = i * 64;
            *word = match n.saturating_sub(lo) {
                0 => 0,
                k if k >= 64 => u64::MAX,
                k => (1u64 << k) - 1,
            };
        }
        Self { words }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Descriptor(")?;
        for (i, w) in self.words.iter().enumerate() {
            if i > 0 {
                write!(f, "_")?;
            }
            write!(f, "{w:016x}")?;
        }
        write!(f, ")")
    }
}

impl From<[u64; DESCRIPTOR_WORDS]> for Descriptor {
    fn from(words: [u64; DESCRIPTOR_WORDS]) -> Self {
        Self::from_words(words)
    }
}

/// An ordered, immutable collection of descriptors indexed `0..len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorSet {
    records: Vec<Descriptor>,
}

impl DescriptorSet {
    pub fn new(records: Vec<Descriptor>) -> Self {
        Self { records }
    }

    /// Parse a buffer of contiguous 64-byte records.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % DESCRIPTOR_BYTES != 0 {
            return Err(MatchError::Layout { len: bytes.len() });
        }
        let count = bytes.len() / DESCRIPTOR_BYTES;
        let mut records = reserve_records(count)?;
        for chunk in bytes.chunks_exact(DESCRIPTOR_BYTES) {
            let mut record = [0u8; DESCRIPTOR_BYTES];
            record.copy_from_slice(chunk);
            records.push(Descriptor::from_bytes(&record));
        }
        Ok(Self { records })
    }

    /// Read exactly `count` records from `reader`.
    pub fn read_from<R: Read>(mut reader: R, count: usize) -> Result<Self> {
        let mut records = reserve_records(count)?;
        let mut record = [0u8; DESCRIPTOR_BYTES];
        for _ in 0..count {
            reader.read_exact(&mut record)?;
            records.push(Descriptor::from_bytes(&record));
        }
        Ok(Self { records })
    }

    /// Write every record, in index order, as raw 64-byte records.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for d in &self.records {
            writer.write_all(&d.to_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Raw byte image (`len() * 64` bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.records.iter().flat_map(|d| d.to_bytes()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Descriptor> {
        self.records.get(index)
    }

    #[inline]
    pub fn as_slice(&self) -> &[Descriptor] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Descriptor> {
        self.records.iter()
    }

    /// Random-read view, for the query side.
    #[inline]
    pub fn cached_view(&self) -> CachedView<'_> {
        CachedView::new(&self.records)
    }

    /// Sequential view, for the train side.
    #[inline]
    pub fn linear_view(&self) -> LinearView<'_> {
        LinearView::new(&self.records)
    }
}

impl FromIterator<Descriptor> for DescriptorSet {
    fn from_iter<I: IntoIterator<Item = Descriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<Descriptor>> for DescriptorSet {
    fn from(records: Vec<Descriptor>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a DescriptorSet {
    type Item = &'a Descriptor;
    type IntoIter = std::slice::Iter<'a, Descriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn reserve_records(count: usize) -> Result<Vec<Descriptor>> {
    let mut records = Vec::new();
    records
        .try_reserve_exact(count)
        .map_err(|_| MatchError::Allocation {
            what: "descriptor records",
            bytes: count.saturating_mul(DESCRIPTOR_BYTES),
        })?;
    Ok(records)
}

/// Read-only random-access view over the query side.
///
/// Descriptors are returned by value: the caller keeps its working set of
/// queries in local storage instead of chasing the shared buffer on every
/// comparison.
#[derive(Debug, Clone, Copy)]
pub struct CachedView<'a> {
    records: &'a [Descriptor],
}

impl<'a> CachedView<'a> {
    #[inline]
    pub fn new(records: &'a [Descriptor]) -> Self {
        Self { records }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load query `index`. Panics when out of bounds.
    #[inline]
    pub fn fetch(&self, index: usize) -> Descriptor {
        self.records[index]
    }

    /// Append the queries in `range` to `buf`.
    #[inline]
    pub fn stage_into<E>(&self, range: Range<usize>, buf: &mut E)
    where
        E: Extend<Descriptor>,
    {
        buf.extend(self.records[range].iter().copied());
    }
}

/// Read-only, in-order view over a contiguous range of the train side.
///
/// Indices reported by [`LinearView::iter`] are positions in the full set,
/// not in the sub-range, so views produced by [`LinearView::range`] can be
/// swept independently and their candidates merged.
#[derive(Debug, Clone, Copy)]
pub struct LinearView<'a> {
    records: &'a [Descriptor],
    base: usize,
}

impl<'a> LinearView<'a> {
    #[inline]
    pub fn new(records: &'a [Descriptor]) -> Self {
        Self { records, base: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the first record of this view in the full set.
    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Sub-view over `range` (relative to this view), clamped to its length.
    #[inline]
    pub fn range(&self, range: Range<usize>) -> LinearView<'a> {
        let end = range.end.min(self.records.len());
        let start = range.start.min(end);
        LinearView {
            records: &self.records[start..end],
            base: self.base + start,
        }
    }

    /// Sub-view number `part` when this view is cut into `parts` contiguous
    /// pieces of near-equal length. Trailing parts may be empty.
    #[inline]
    pub fn part(&self, part: usize, parts: usize) -> LinearView<'a> {
        let chunk = self.records.len().div_ceil(parts.max(1));
        self.range(part * chunk..(part + 1) * chunk)
    }

    /// All `parts` pieces of [`LinearView::part`], in order.
    pub fn split(&self, parts: usize) -> impl Iterator<Item = LinearView<'a>> + 'a {
        let view = *self;
        let parts = parts.max(1);
        (0..parts).map(move |p| view.part(p, parts))
    }

    /// `(global_index, descriptor)` pairs in index order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a Descriptor)> + 'a {
        let base = self.base;
        let records: &'a [Descriptor] = self.records;
        records
            .iter()
            .enumerate()
            .map(move |(i, d)| (base + i, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout_is_64_bytes_without_padding() {
        assert_eq!(std::mem::size_of::<Descriptor>(), 64);
        assert_eq!(std::mem::align_of::<Descriptor>(), 64);
        assert_eq!(std::mem::size_of::<[Descriptor; 3]>(), 3 * 64);
    }

    #[test]
    fn bytes_round_trip_is_lossless() {
        let bytes: Vec<u8> = (0..128u32).map(|i| (i * 7 + 3) as u8).collect();
        let set = DescriptorSet::from_bytes(&bytes).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_bytes(), bytes);
    }

    #[test]
    fn ragged_buffer_is_a_layout_error() {
        let err = DescriptorSet::from_bytes(&[0u8; 65]).unwrap_err();
        assert!(matches!(err, MatchError::Layout { len: 65 }));
    }

    #[test]
    fn short_reader_is_a_transfer_error() {
        let bytes = [0u8; 64 + 10];
        let err = DescriptorSet::read_from(&bytes[..], 2).unwrap_err();
        assert!(matches!(err, MatchError::Transfer(_)));
    }

    #[test]
    fn low_bits_have_exact_popcount() {
        for n in [0, 1, 63, 64, 65, 200, 511, 512, 900] {
            assert_eq!(Descriptor::with_low_bits(n).count_ones() as usize, n.min(512));
        }
    }

    #[test]
    fn bit_flip_toggles_one_bit() {
        let d = Descriptor::ZERO.with_bit_flipped(130);
        assert!(d.bit(130));
        assert_eq!(d.count_ones(), 1);
        assert_eq!(d.with_bit_flipped(130), Descriptor::ZERO);
    }

    #[test]
    fn split_covers_all_indices_once() {
        let set: DescriptorSet = (0..10).map(Descriptor::with_low_bits).collect();
        let view = set.linear_view();
        let seen: Vec<usize> = view.split(3).flat_map(|v| v.iter().map(|(i, _)| i)).collect();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(view.split(16).count(), 16);
    }

    #[test]
    fn nested_ranges_keep_global_indices() {
        let set: DescriptorSet = (0..8).map(Descriptor::with_low_bits).collect();
        let inner = set.linear_view().range(2..7).range(1..3);
        assert_eq!(inner.base(), 3);
        let idx: Vec<usize> = inner.iter().map(|(i, _)| i).collect();
        assert_eq!(idx, vec![3, 4]);
    }

    #[test]
    fn cached_view_stages_by_value() {
        let set: DescriptorSet = (0..4).map(Descriptor::with_low_bits).collect();
        let mut buf = Vec::new();
        set.cached_view().stage_into(1..3, &mut buf);
        assert_eq!(buf, vec![set.as_slice()[1], set.as_slice()[2]]);
    }
}
