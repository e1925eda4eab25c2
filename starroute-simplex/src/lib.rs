//! Reference restricted master problem backend.
//!
//! [`SimplexMaster`] implements [`starroute_core::MasterProblem`] with a
//! dense two-phase simplex and a small LP-based branch-and-bound for the
//! integer solve. It has no native dependencies and suits the instance sizes
//! used in tests and benchmarks; larger models call for a dedicated LP
//! solver behind the same trait.
//!
//! ```
//! use std::time::Duration;
//! use starroute_core::{InstanceBuilder, MasterProblem, Route};
//! use starroute_simplex::SimplexMaster;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let instance = InstanceBuilder::new(2, 0)
//!     .capacity(1)
//!     .customer(1, 1, [1])
//!     .symmetric_edge(0, 1, 3.0)
//!     .build()?;
//! let mut master = SimplexMaster::new(&instance);
//! master.add_columns(vec![Route::through(&instance, vec![0, 1, 0], [1])?]);
//! let relaxation = master.solve_relaxation(Duration::from_secs(1));
//! assert!(relaxation.feasible);
//! assert_eq!(relaxation.objective, 6.0);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod integer;
mod master;
mod tableau;

pub use master::{Coverage, SimplexMaster, SimplexMasterConfig};
