//! The run itself.
//!
//! | File          | Entry point                                | Scope                      |
//! |---------------|--------------------------------------------|----------------------------|
//! | `run.rs`      | `run_configuration`                        | One configuration file     |
//! | `summary.rs`  | `collect_configuration_run_summary_logs`   | Every configuration file   |

pub mod run;
pub mod summary;
