// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error::Error as StdError;
use std::fmt;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by Resona.
#[derive(Debug)]
pub enum Error {
    /// The input format declared by a chunk or an `open` call is incompatible
    /// with the node it was given to.
    BadFormat(&'static str),
    /// A parser lost synchronization and scanned past the maximum frame size
    /// without a single acceptance.
    OutOfSync(&'static str),
    /// A buffer could not be grown to the required size.
    ResourceExhausted(&'static str),
    /// An IO error occurred while reading, writing, or seeking the underlying
    /// stream.
    HostIo(std::io::Error),
    /// The caller violated the node lifecycle, e.g. `process` before `open`.
    ProtocolViolation(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::BadFormat(msg) => {
                write!(f, "unsupported format: {}", msg)
            }
            Error::OutOfSync(msg) => {
                write!(f, "lost synchronization: {}", msg)
            }
            Error::ResourceExhausted(msg) => {
                write!(f, "buffer limit reached: {}", msg)
            }
            Error::HostIo(ref err) => {
                write!(f, "io error: {}", err)
            }
            Error::ProtocolViolation(msg) => {
                write!(f, "lifecycle violation: {}", msg)
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::HostIo(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::HostIo(err)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a bad format error.
pub fn bad_format_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::BadFormat(desc))
}

/// Convenience function to create an out-of-sync error.
pub fn out_of_sync_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::OutOfSync(desc))
}

/// Convenience function to create a resource exhaustion error.
pub fn resource_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::ResourceExhausted(desc))
}

/// Convenience function to create a lifecycle violation error.
pub fn protocol_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::ProtocolViolation(desc))
}
