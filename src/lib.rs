/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]
#![allow(clippy::type_complexity)]

pub mod avl;
pub mod context;
pub mod error;
pub mod flags;
pub mod flatten;
pub mod graph;
pub mod heap;
pub mod io;
pub mod record;
pub mod sp;
pub mod span;
pub mod traverse;

pub mod prelude {
    pub use crate::error::{GraphError, Result};
    pub use crate::flags::{
        AddFlags, EdgeStatus, Endianness, GraphFamily, GraphOptions, GraphVersion, NodeStatus,
    };
    pub use crate::graph::{Graph, GraphBuilder};
    pub use crate::io::{read_full, write_full, Header};
    pub use crate::record::{Edge, Id, Node};
    pub use crate::sp::{shortest_distance, shortest_path, ClipSp, NoClip as NoClipSp, SpCache};
    pub use crate::span::{
        depth_components, depth_spanning, minimum_spanning, ClipSpan, NoClip as NoClipSpan,
    };
    pub use crate::traverse::{EdgeTraverser, EdgesetSide, EdgesetTraverser, NodeTraverser};
}
