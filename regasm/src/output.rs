//! Binary artifact writer

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

/// Write `code` prefixed with its length as a little-endian `u32`.
pub fn write_bin<W: Write>(code: &[u8], mut w: W) -> io::Result<()> {
    let len = u32::try_from(code.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "code does not fit a 32-bit length header")
    })?;
    w.write_u32::<LittleEndian>(len)?;
    w.write_all(code)?;
    w.flush()
}
