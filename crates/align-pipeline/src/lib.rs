//! The E-step/M-step pipeline stages: the mapper (with in-process
//! combining), the three-mode reducer skeleton (reduce / combine /
//! tension), and the Viterbi decoder. Ties [`align_core`]'s pure math to
//! [`align_store`]'s shard storage over the textual shuffle wire format.

pub mod groups;
pub mod mapper;
pub mod records;
pub mod reducer;
pub mod viterbi;

pub use groups::ShuffleGroups;
pub use mapper::{Mapper, MapperStats};
pub use reducer::{Mode as ReducerMode, ReducerOutcome};
pub use viterbi::Viterbi;
