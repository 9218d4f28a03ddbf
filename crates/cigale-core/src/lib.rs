//! Driver for `pcigale` savefluxes simulations: run-configuration patching,
//! filter naming, process orchestration and FITS model tables.

pub mod config;
pub mod domain;
pub mod driver;
pub mod filters;
pub mod flux;
pub mod grid;
pub mod process;
pub mod serialization;
pub mod table;
