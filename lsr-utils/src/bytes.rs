//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cell::RefCell;
use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut, TryGetError};

// Scratch buffer reused by the packet encoders of the current thread.
thread_local!(
    pub static TLS_BUF: RefCell<BytesMut> =
        RefCell::new(BytesMut::with_capacity(4096))
);

// Extension methods for Bytes.
pub trait BytesExt {
    /// Gets an IPv4 address from `self` in network byte order.
    ///
    /// The current position is advanced by 4.
    fn try_get_ipv4(&mut self) -> Result<Ipv4Addr, TryGetError>;

    /// Gets an IPv4 address from `self`, mapping 0.0.0.0 to `None`.
    ///
    /// The current position is advanced by 4.
    fn try_get_opt_ipv4(&mut self) -> Result<Option<Ipv4Addr>, TryGetError>;

    /// Splits off the next `len` bytes of `self`.
    ///
    /// Fails without consuming anything when fewer than `len` bytes remain.
    fn try_split_to(&mut self, len: usize) -> Result<Bytes, TryGetError>;
}

// Extension methods for BytesMut.
pub trait BytesMutExt {
    /// Writes an IPv4 address to `self` in network byte order.
    ///
    /// The current position is advanced by 4.
    fn put_ipv4(&mut self, addr: &Ipv4Addr);

    /// Overwrites the big-endian u16 stored at `pos`.
    ///
    /// # Panics
    ///
    /// This function panics if `pos + 2` is out of bounds.
    fn rewrite_u16(&mut self, pos: usize, value: u16);
}

// ===== impl Bytes =====

impl BytesExt for Bytes {
    fn try_get_ipv4(&mut self) -> Result<Ipv4Addr, TryGetError> {
        self.try_get_u32().map(Ipv4Addr::from)
    }

    fn try_get_opt_ipv4(&mut self) -> Result<Option<Ipv4Addr>, TryGetError> {
        let addr = self.try_get_ipv4()?;
        Ok((!addr.is_unspecified()).then_some(addr))
    }

    fn try_split_to(&mut self, len: usize) -> Result<Bytes, TryGetError> {
        if self.remaining() < len {
            return Err(TryGetError {
                requested: len,
                available: self.remaining(),
            });
        }
        Ok(self.split_to(len))
    }
}

// ===== impl BytesMut =====

impl BytesMutExt for BytesMut {
    fn put_ipv4(&mut self, addr: &Ipv4Addr) {
        self.put_u32((*addr).into())
    }

    fn rewrite_u16(&mut self, pos: usize, value: u16) {
        self[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
    }
}

// ===== unit tests =====
