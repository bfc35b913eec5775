#![warn(missing_docs)]
//! Meshbench Process Groups
//!
//! A fixed-size group of cooperating processes identified by rank
//! (0..size-1), communicating exclusively through message passing over a
//! full mesh of pipes. The [`GroupContext`] carries identity and the
//! messaging primitives: tagged blocking send/receive plus the
//! collectives (broadcast, scatter, gather, reduce, barrier).
//!
//! Groups come into being three ways:
//!
//! - [`spawn_group`] re-executes the current binary `size` times with the
//!   hidden worker flag and wires the children together (launcher side),
//! - [`attach_worker`] adopts the inherited link descriptors inside a
//!   spawned worker,
//! - [`local_mesh`] builds all contexts inside one process for tests and
//!   embedding.

mod error;
mod group;
mod launch;
mod link;
mod local;

pub use error::GroupError;
pub use group::{GroupContext, ReduceOp};
pub use launch::{
    FD_BASE, LaunchedGroup, MAX_GROUP_SIZE, MESH_GROUP_ENV, WORKER_FLAG, attach_worker,
    spawn_group, spawn_group_with_binary,
};
pub use link::{LinkRead, LinkWrite};
pub use local::local_mesh;
