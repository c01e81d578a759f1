pub use crate::frontier::partition_by_rank;
pub use crate::frontier::Frontier;
pub use crate::frontier::FrontierItem;

pub use crate::graph::BidiGraphPart;

pub use crate::partition::BalancedSlice;
pub use crate::partition::BlockCyclic;
pub use crate::partition::ContinuousPartition;
pub use crate::partition::Cyclic;
pub use crate::partition::ExplicitSortedContinuous;
pub use crate::partition::Partition;
pub use crate::partition::TrivialSlice;

pub use crate::Edge;
pub use crate::Error;
pub use crate::Vertex;

pub use bsp_comm::Communicator;
