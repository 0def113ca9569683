//! Converts 3D models (OBJ, glTF/GLB) into GTA V prop assets packaged as a
//! FiveM resource.
//!
//! The reusable core is a glTF scene-graph document model: a typed,
//! reference-tracked property graph ([`document`]) with readers and writers
//! for the glTF interchange forms, including the binary container
//! ([`io`]). On top of it sit the model importers ([`format`]), the
//! intermediary prop mesh with its normalization ([`conversion`]), the
//! GTA V XML generators ([`gtav`]), and the conversion pipeline
//! ([`pipeline`]).

pub mod conversion;
pub mod document;
pub mod error;
pub mod format;
pub mod graph;
pub mod gtav;
pub mod io;
pub mod pipeline;

pub use error::{Error, Result};
