//! Inference of minimal graph transformation rule sets for labeled iterated maps.
//!
//! An iterated map is a sequence of labeled graphs together with observed transitions between
//! them. The crate derives candidate rules from every transition ([`generator`]), checks which
//! transitions each rule explains and how well ([`coverage`]), and selects a smallest rule set
//! explaining everything, trading rule count against distortion ([`selection`]).
//!
//! ```no_run
//! use gtri::config::InferenceConfig;
//! use std::path::Path;
//!
//! let config = InferenceConfig::default().with_modifier(0.5).unwrap();
//! let rules = gtri::pipeline::run(Path::new("./input"), &config).unwrap();
//! println!("{}", rules.to_json().unwrap());
//! ```

#[cfg(test)]
mod test_utils;

pub mod config;
pub mod coverage;
pub mod error;
pub mod generator;
pub mod graph;
pub mod pipeline;
pub mod result;
pub mod rule;
pub mod selection;
pub mod solver;
pub mod store;

/// Extract the "simple name" of a type argument at compile time.
///
/// In the future, this should be a `const fn`, but `type_name` and `unwrap_or` are not
/// yet stabilized as `const` functions.
fn simple_type_name<T>() -> &'static str {
    std::any::type_name::<T>().split("::").last().unwrap_or("?")
}
