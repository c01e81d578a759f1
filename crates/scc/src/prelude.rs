pub use crate::coloring::label_search;
pub use crate::fwbw::backward_search;
pub use crate::fwbw::forward_backward_search;
pub use crate::fwbw::forward_search;
pub use crate::pipeline::scc;
pub use crate::pipeline::SccConfig;
pub use crate::pivot::select_pivot;
pub use crate::pivot::select_pivot_from_candidate;
pub use crate::pivot::DegreeCandidate;
pub use crate::tarjan::tarjan_scc;
pub use crate::trim::trim_exhaustive_first;
pub use crate::trim::trim_first;
pub use crate::trim::trim_residual;
pub use crate::UNDECIDED;

pub use graph_part::prelude::*;

pub use bsp_comm::LocalCluster;
pub use bsp_comm::SingleProcess;
