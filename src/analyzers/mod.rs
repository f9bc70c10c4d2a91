pub mod base;
pub mod calls;
pub mod common;
pub mod generic;
pub mod go;
pub mod java;
pub mod json;
pub mod python;
pub mod registry;
pub mod typescript;
