//! Loop-Bound Estimation Engine
//!
//! Static trip-count intervals for every loop of a module.
//!
//! # Components
//! - **Counter-root finder** (`counter`): exit guard discovery and backward slicing to the
//!   loop-carried storage cell
//! - **Structural classifier** (`classifier`, `constants`): decides whether a computed
//!   bound can be trusted
//! - **Increment dataflow solver** (`dataflow`, `delta`, `edge_function`, `increment`):
//!   lattice-based fixed point over the interval of per-iteration steps
//! - **Bound solver** (`solver`): closed-form trip counts per increment family
//! - **Result aggregator** (`result`, `analyzer`): one `LoopBoundResult` per loop

pub mod analyzer;
pub mod classifier;
pub mod constants;
pub mod counter;
pub mod dataflow;
pub mod delta;
pub mod edge_function;
pub mod increment;
pub mod result;
pub mod solver;
pub mod storage;

pub use analyzer::LoopBoundAnalyzer;
pub use delta::{DeltaInterval, Family, Interval};
pub use result::{
    Classification, LoopBoundReport, LoopBoundResult, LoopKey, TripCount, TripCountSource,
};
pub use storage::StorageCell;
