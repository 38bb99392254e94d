//! Command-line front ends for the Firestore export tools.
//!
//! Each binary under `src/bin/` is a thin `main` around one of these modules:
//! - [`convert`]: export directory → JSON (`firestore-to-json`)
//! - [`viewer`]: interactive exploration of a converted file (`firestore-viewer`)
//! - [`csv_export`]: one collection → CSV (`collection-to-csv`)

pub mod convert;
pub mod csv_export;
pub mod logging;
pub mod viewer;

pub use logging::{CommonArgs, LogFormat, init_tracing};
