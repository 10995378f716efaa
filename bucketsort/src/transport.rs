//! Implementations of the collective transport
mod local;
#[cfg(feature = "mpi")]
mod multi_node;

pub use local::{LocalCluster, LocalTransport};

#[cfg(feature = "mpi")]
pub use multi_node::MpiTransport;
