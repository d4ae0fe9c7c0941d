//! Voltage inference engine.
//!
//! Three sub-phases run in order, each filling only voltages that are
//! still 0:
//!
//! 1. [`seed`]: edges near a known-voltage Node (then Tower) adopt its voltage
//! 2. [`propagate`]: fixed number of one-hop neighbor-voting passes
//! 3. [`splash`]: towers, nodes and areas adopt the voltage of a resolved edge
//!
//! A resolved voltage is never changed or reset afterwards. Assets that are
//! still unknown at the end belong to electrically isolated components and
//! are reported by the audit, not treated as errors.

pub mod propagate;
pub mod seed;
pub mod splash;

pub use propagate::{propagate_voltages, propagation_pass, VoteTable};
pub use seed::{seed_rules, seed_voltages};
pub use splash::{splash_back, SplashSummary};
