// error.rs - onion packet error types
// Copyright (C) 2018  David Anthony Stainton.
//
// MIT License
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use std::io;

use thiserror::Error;

/// Failures of the elliptic curve key wrappers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid public key encoding")]
    InvalidPublicKey,

    #[error("invalid private key encoding")]
    InvalidPrivateKey,

    #[error("blinding produced a degenerate key")]
    DegenerateBlinding,
}

/// Errors that can be produced while building an onion packet. None of
/// these are worth retrying with the same inputs.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("route length {0} is outside 1..=MAX_HOPS")]
    InvalidRouteLength(usize),

    #[error("route has {route} hops but {payloads} hop payloads were supplied")]
    PayloadCountMismatch { route: usize, payloads: usize },

    #[error("invalid key material for hop {hop}: {source}")]
    InvalidKey { hop: usize, source: KeyError },
}

/// Errors that can be produced while unwrapping one onion layer.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("unsupported onion packet version {0}")]
    UnsupportedVersion(u8),

    #[error("onion packet must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid ephemeral key: {0}")]
    InvalidEphemeralKey(#[from] KeyError),

    #[error("message authentication code did not match")]
    IntegrityFailure,

    #[error("onion packet has already been processed")]
    ReplayDetected,

    #[error("replay log failure: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to read onion packet: {0}")]
    Io(#[from] io::Error),
}

/// Errors of the storage backends underlying the replay log. A failed
/// batch leaves the store as it was before the batch.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error on '{path}': {source}")]
    Io { path: std::path::PathBuf, source: io::Error },

    #[error("the replay store has been closed")]
    Closed,

    #[error("storage task failed: {0}")]
    Task(String),
}

/// Lifecycle errors of the decayed replay log.
#[derive(Debug, Error)]
pub enum LogError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("the garbage collector needs a running tokio runtime")]
    NoRuntime,

    #[error("the garbage collector is already running")]
    AlreadyRunning,

    #[error("the decayed log has been stopped")]
    Stopped,

    #[error("invalid replay log configuration: {0}")]
    Config(#[from] toml::de::Error),
}
