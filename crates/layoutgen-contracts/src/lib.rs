//! Version-pinned schema identifiers for layoutgen's machine-readable I/O.
//!
//! Catalogs, generation indexes and `show` reports all carry one of these in
//! their `schema_version` field. Bump the version whenever the shape changes.

pub const CATALOG_SCHEMA_VERSION: &str = "layoutgen.catalog@0.1.0";
pub const INDEX_SCHEMA_VERSION: &str = "layoutgen.index@0.1.0";
pub const SHOW_REPORT_SCHEMA_VERSION: &str = "layoutgen.show.report@0.1.0";

/// File name of the generation index written next to the artifacts.
pub const INDEX_FILE_NAME: &str = "layouts.index.json";
