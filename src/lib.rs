#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod cli;
pub mod config;
mod constants;
pub mod continuation;
pub mod ctx;
pub mod errors;
pub mod git;
pub mod remote;
pub mod scope;
pub mod store;
mod subcommands;
pub mod tree;

#[cfg(test)]
mod test_utils;
