//! Object-layout descriptor generator.
//!
//! One canonical [`descriptor::LayoutDescriptor`] per heap-object kind is
//! resolved into an [`offsets::OffsetView`], projected by independent emitters
//! into C struct, assembler offset and GC scan-table views, and cross-checked
//! before anything is written.

pub mod catalog;
pub mod check;
pub mod descriptor;
pub mod diagnostics;
pub mod driver;
pub mod emit;
pub mod error;
pub mod index;
pub mod names;
pub mod offsets;
pub mod target;

mod util;

pub use error::LayoutError;
pub use layoutgen_targets::{TargetConfig, TargetId, TargetSpec};
