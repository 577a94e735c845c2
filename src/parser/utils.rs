//! Checked big-endian read helpers over [Bytes] buffers.

use crate::error::ParserError;
use crate::models::{Afi, Asn, AsnLength, NetworkPrefix};
use bytes::{Buf, Bytes};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[cold]
fn eof(name: &'static str, expected: usize, found: usize) -> ParserError {
    ParserError::InconsistentFieldLength {
        name,
        expected,
        found,
    }
}

/// Extension trait for reading wire-format fields out of a byte buffer.
/// Every read validates the remaining length first so that a malformed
/// declared length surfaces as a parse error, never a panic.
pub trait ReadUtils: Sized {
    fn remaining(&self) -> usize;
    fn read_u8(&mut self) -> Result<u8, ParserError>;
    fn read_u16(&mut self) -> Result<u16, ParserError>;
    fn read_u32(&mut self) -> Result<u32, ParserError>;
    fn split_to_checked(&mut self, n: usize) -> Result<Self, ParserError>;
    fn read_exact_bytes(&mut self, buffer: &mut [u8]) -> Result<(), ParserError>;

    #[inline(always)]
    fn require(&self, n: usize, name: &'static str) -> Result<(), ParserError> {
        if self.remaining() >= n {
            return Ok(());
        }
        Err(eof(name, n, self.remaining()))
    }

    fn read_ipv4_address(&mut self) -> Result<Ipv4Addr, ParserError> {
        self.require(4, "IPv4 address")?;
        Ok(Ipv4Addr::from(self.read_u32()?))
    }

    fn read_ipv6_address(&mut self) -> Result<Ipv6Addr, ParserError> {
        self.require(16, "IPv6 address")?;
        let mut buffer = [0u8; 16];
        self.read_exact_bytes(&mut buffer)?;
        Ok(Ipv6Addr::from(buffer))
    }

    fn read_address(&mut self, afi: Afi) -> Result<IpAddr, ParserError> {
        match afi {
            Afi::Ipv4 => self.read_ipv4_address().map(IpAddr::V4),
            Afi::Ipv6 => self.read_ipv6_address().map(IpAddr::V6),
        }
    }

    #[inline(always)]
    fn read_afi(&mut self) -> Result<Afi, ParserError> {
        let code = self.read_u16()?;
        Afi::try_from(code)
            .map_err(|_| ParserError::ParseError(format!("unknown address family: {}", code)))
    }

    #[inline]
    fn read_asn(&mut self, as_length: AsnLength) -> Result<Asn, ParserError> {
        match as_length {
            AsnLength::Bits16 => self.read_u16().map(|v| Asn(v as u32)),
            AsnLength::Bits32 => self.read_u32().map(Asn),
        }
    }

    fn read_asns(&mut self, as_length: AsnLength, count: usize) -> Result<Vec<Asn>, ParserError> {
        let width = match as_length {
            AsnLength::Bits16 => 2,
            AsnLength::Bits32 => 4,
        };
        self.require(count * width, "AS path segment")?;
        let mut asns = Vec::with_capacity(count);
        for _ in 0..count {
            asns.push(self.read_asn(as_length)?);
        }
        Ok(asns)
    }

    /// Read one NLRI-encoded prefix: optional 4-byte path id, a one-byte
    /// bit length, then the minimal number of address bytes.
    fn read_nlri_prefix(&mut self, afi: Afi, add_path: bool) -> Result<NetworkPrefix, ParserError> {
        let path_id = if add_path { self.read_u32()? } else { 0 };
        let bit_len = self.read_u8()?;
        let byte_len = (bit_len as usize + 7) / 8;

        let prefix = match afi {
            Afi::Ipv4 => {
                if bit_len > 32 {
                    return Err(ParserError::ParseError(format!(
                        "invalid IPv4 prefix length: {}",
                        bit_len
                    )));
                }
                let mut buffer = [0u8; 4];
                self.read_exact_bytes(&mut buffer[..byte_len])?;
                IpNet::V4(Ipv4Net::new(Ipv4Addr::from(buffer), bit_len)?)
            }
            Afi::Ipv6 => {
                if bit_len > 128 {
                    return Err(ParserError::ParseError(format!(
                        "invalid IPv6 prefix length: {}",
                        bit_len
                    )));
                }
                let mut buffer = [0u8; 16];
                self.read_exact_bytes(&mut buffer[..byte_len])?;
                IpNet::V6(Ipv6Net::new(Ipv6Addr::from(buffer), bit_len)?)
            }
        };

        Ok(NetworkPrefix::new(prefix, path_id))
    }

    /// Read NLRI prefixes until the buffer is exhausted.
    fn read_nlri_list(
        &mut self,
        afi: Afi,
        add_path: bool,
    ) -> Result<Vec<NetworkPrefix>, ParserError> {
        let mut prefixes = Vec::with_capacity(self.remaining() / 4);
        while self.remaining() > 0 {
            prefixes.push(self.read_nlri_prefix(afi, add_path)?);
        }
        Ok(prefixes)
    }

    fn read_n_bytes(&mut self, n: usize) -> Result<Vec<u8>, ParserError> {
        self.require(n, "raw bytes")?;
        let mut buffer = vec![0u8; n];
        self.read_exact_bytes(&mut buffer)?;
        Ok(buffer)
    }
}

impl ReadUtils for Bytes {
    #[inline]
    fn remaining(&self) -> usize {
        self.len()
    }

    #[inline(always)]
    fn read_u8(&mut self) -> Result<u8, ParserError> {
        if self.is_empty() {
            return Err(eof("read_u8", 1, 0));
        }
        Ok(self.get_u8())
    }

    #[inline(always)]
    fn read_u16(&mut self) -> Result<u16, ParserError> {
        if self.len() < 2 {
            return Err(eof("read_u16", 2, self.len()));
        }
        Ok(self.get_u16())
    }

    #[inline(always)]
    fn read_u32(&mut self) -> Result<u32, ParserError> {
        if self.len() < 4 {
            return Err(eof("read_u32", 4, self.len()));
        }
        Ok(self.get_u32())
    }

    #[inline]
    fn split_to_checked(&mut self, n: usize) -> Result<Bytes, ParserError> {
        if self.len() < n {
            return Err(eof("split_to", n, self.len()));
        }
        Ok(self.split_to(n))
    }

    #[inline]
    fn read_exact_bytes(&mut self, buffer: &mut [u8]) -> Result<(), ParserError> {
        if self.len() < buffer.len() {
            return Err(eof("read_exact", buffer.len(), self.len()));
        }
        self.copy_to_slice(buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_reads() {
        let mut data = Bytes::from_static(&[0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03]);
        assert_eq!(data.read_u8().unwrap(), 1);
        assert_eq!(data.read_u16().unwrap(), 2);
        assert_eq!(data.read_u32().unwrap(), 3);
        assert!(data.read_u8().is_err());
    }

    #[test]
    fn test_read_nlri_prefix() {
        // 10.0.0.0/8 packs into a single address byte
        let mut data = Bytes::from_static(&[8, 10]);
        let prefix = data.read_nlri_prefix(Afi::Ipv4, false).unwrap();
        assert_eq!(prefix.to_string(), "10.0.0.0/8");
        assert!(data.is_empty());
    }

    #[test]
    fn test_read_nlri_prefix_overlong_mask() {
        let mut data = Bytes::from_static(&[44, 10, 0, 0, 0, 0, 0]);
        assert!(data.read_nlri_prefix(Afi::Ipv4, false).is_err());
    }

    #[test]
    fn test_read_asns_short_buffer() {
        let mut data = Bytes::from_static(&[0, 0, 0, 1]);
        assert!(data.read_asns(AsnLength::Bits32, 2).is_err());
    }
}
