//! The Librarian (C7): call-graph clustering, module naming, and the
//! dashboard's graph visualization side-output.

pub mod cluster;
pub mod error;
pub mod graph;
pub mod naming;
pub mod viz;

pub use cluster::Librarian;
pub use error::GraphError;
pub use graph::CallGraph;
pub use naming::{generate_module_name, slugify};
pub use viz::{visualization_data, VizGraph, VizLink, VizNode};
