//! Bounds checked access to the little endian fields of a chunk.
//!
//! Every accessor takes a byte offset relative to the start of the
//! chunk (so including the 16 byte prefix) and fails instead of reading
//! past the end.

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("field at byte {offset} ({width} bytes wide) lies outside the chunk of {len} bytes")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },
    #[error("{what} at byte {offset} is negative: {value}")]
    Negative {
        offset: usize,
        what: &'static str,
        value: i64,
    },
    #[error("{count} records of {size} bytes starting at byte {offset} do not fit in memory")]
    TooManyRecords {
        offset: usize,
        count: usize,
        size: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    bytes: &'a [u8],
}

impl<'a> Fields<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn slice(&self, offset: usize, width: usize) -> Result<&'a [u8], Error> {
        offset
            .checked_add(width)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(Error::OutOfBounds {
                offset,
                width,
                len: self.bytes.len(),
            })
    }

    pub fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N], Error> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.slice(offset, N)?);
        Ok(array)
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32, Error> {
        self.array(offset).map(u32::from_le_bytes)
    }

    pub fn i32_at(&self, offset: usize) -> Result<i32, Error> {
        self.array(offset).map(i32::from_le_bytes)
    }

    pub fn u64_at(&self, offset: usize) -> Result<u64, Error> {
        self.array(offset).map(u64::from_le_bytes)
    }

    pub fn i64_at(&self, offset: usize) -> Result<i64, Error> {
        self.array(offset).map(i64::from_le_bytes)
    }

    pub fn f64_at(&self, offset: usize) -> Result<f64, Error> {
        self.array(offset).map(f64::from_le_bytes)
    }

    /// A 32 bit count, length or offset. These are signed on disk.
    pub fn size_from_i32(&self, offset: usize, what: &'static str) -> Result<usize, Error> {
        let value = self.i32_at(offset)?;
        usize::try_from(value).map_err(|_| Error::Negative {
            offset,
            what,
            value: value.into(),
        })
    }

    /// A 64 bit count. These are signed on disk.
    pub fn size_from_i64(&self, offset: usize, what: &'static str) -> Result<usize, Error> {
        let value = self.i64_at(offset)?;
        // a count that does not fit a usize can not describe records in
        // this chunk, report it as not fitting
        usize::try_from(value).map_err(|_| {
            if value < 0 {
                Error::Negative {
                    offset,
                    what,
                    value,
                }
            } else {
                Error::OutOfBounds {
                    offset,
                    width: usize::MAX,
                    len: self.bytes.len(),
                }
            }
        })
    }

    /// Text starting at `offset` up to the first NUL byte, or the end
    /// of the chunk if there is none.
    pub fn text_from(&self, offset: usize) -> Result<&'a [u8], Error> {
        let rest = self.bytes.get(offset..).ok_or(Error::OutOfBounds {
            offset,
            width: 0,
            len: self.bytes.len(),
        })?;
        let end = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
        Ok(&rest[..end])
    }

    /// Splits `count` fixed size records starting at `offset` off into
    /// their own [`Fields`], each addressed from zero.
    pub fn records(
        &self,
        offset: usize,
        count: usize,
        size: usize,
    ) -> Result<impl Iterator<Item = Fields<'a>>, Error> {
        let total = count.checked_mul(size).ok_or(Error::TooManyRecords {
            offset,
            count,
            size,
        })?;
        let bytes = self.slice(offset, total)?;
        Ok(bytes.chunks_exact(size.max(1)).take(count).map(Fields::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x1000i64.to_le_bytes());
        bytes.extend_from_slice(&(-2i32).to_le_bytes());
        bytes.extend_from_slice(&1.5f64.to_le_bytes());
        let fields = Fields::new(&bytes);

        assert_eq!(fields.i64_at(0).unwrap(), 0x1000);
        assert_eq!(fields.u64_at(0).unwrap(), 0x1000);
        assert_eq!(fields.i32_at(8).unwrap(), -2);
        assert_eq!(fields.f64_at(12).unwrap(), 1.5);
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let bytes = [0u8; 10];
        let fields = Fields::new(&bytes);
        assert_eq!(
            fields.i64_at(4),
            Err(Error::OutOfBounds {
                offset: 4,
                width: 8,
                len: 10
            })
        );
        assert!(fields.slice(usize::MAX, 2).is_err());
        assert!(fields.text_from(11).is_err());
    }

    #[test]
    fn negative_sizes_are_rejected() {
        let bytes = (-5i32).to_le_bytes();
        let fields = Fields::new(&bytes);
        assert!(matches!(
            fields.size_from_i32(0, "channel count"),
            Err(Error::Negative { value: -5, .. })
        ));
    }

    #[test]
    fn text_stops_at_nul() {
        let bytes = b"xx<a>1</a>\0\0garbage";
        let fields = Fields::new(bytes);
        assert_eq!(fields.text_from(2).unwrap(), b"<a>1</a>");
        assert_eq!(fields.text_from(bytes.len()).unwrap(), b"");
    }

    #[test]
    fn records_are_split_and_rebased() {
        let bytes: Vec<u8> = (0u8..20).collect();
        let fields = Fields::new(&bytes);
        let records: Vec<_> = fields.records(4, 2, 8).unwrap().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].array::<2>(0).unwrap(), [12, 13]);
        assert!(fields.records(4, 3, 8).is_err());
        assert!(matches!(
            fields.records(0, usize::MAX, 8),
            Err(Error::TooManyRecords { .. })
        ));
    }
}
