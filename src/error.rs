/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The error taxonomy shared by every public operation in this crate.
//!
//! The original C library threaded errors through a per-context `iErrno`
//! field, which is unsound to share across threads doing concurrent
//! read-only queries (see the design note on "Global per-context error
//! state" in `SPEC_FULL.md` §9). Every fallible operation here returns a
//! [`Result<T, GraphError>`] instead.

use thiserror::Error;

/// Every way an operation on a [`Graph`](crate::graph::Graph) can fail.
///
/// Each variant is a distinct failure mode with no additional payload,
/// mirroring the original library's `DGL_ERR_*` taxonomy one-to-one.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphError {
    #[error("bad argument")]
    BadArgument,
    #[error("graph version is malformed")]
    BadVersion,
    #[error("graph version is not supported by this build")]
    VersionNotSupported,
    #[error("node record failed an invariant check")]
    BadNodeType,
    #[error("edge record failed an invariant check")]
    BadEdge,
    #[error("memory allocation failed")]
    MemoryExhausted,
    #[error("priority queue internal error")]
    HeapError,
    #[error("short or failed read")]
    Read,
    #[error("short or failed write")]
    Write,
    #[error("header endianness byte is neither big nor little")]
    UnknownByteOrder,
    #[error("node not found")]
    NodeNotFound,
    #[error("edge not found")]
    EdgeNotFound,
    #[error("head node not found")]
    HeadNodeNotFound,
    #[error("tail node not found")]
    TailNodeNotFound,
    #[error("operation is not valid on a flat graph")]
    BadOnFlatGraph,
    #[error("operation is not valid on a tree graph")]
    BadOnTreeGraph,
    #[error("internal tree search is in an inconsistent state")]
    TreeSearchError,
    #[error("an internal reference was unexpectedly absent")]
    UnexpectedNullPointer,
    #[error("node already exists")]
    NodeAlreadyExist,
    #[error("edge already exists")]
    EdgeAlreadyExist,
    #[error("the requested node is an isolated component and has no edgeset")]
    NodeIsAComponent,
    #[error("operation is not supported by this graph version")]
    NotSupported,
    #[error("method is reserved and not yet defined")]
    UndefinedMethod,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, GraphError>;
