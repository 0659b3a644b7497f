//! Download a parquet file over HTTP and bulk-load it into a postgres table.
//!
//! Four sequential stages: [`config`] parses the CLI into a typed run
//! configuration, [`fetch`] streams the remote file to local disk, [`decode`]
//! reads it back as arrow record batches, and [`load`] recreates the
//! destination table and writes the rows in fixed-size chunks over the
//! binary COPY protocol. [`pipeline::run`] wires them together.

pub mod config;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod load;
pub mod pipeline;
pub mod schema;
