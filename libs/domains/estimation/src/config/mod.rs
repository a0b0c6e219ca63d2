//! Configuration loading: parse files, build the module tree, resolve variables.

pub mod blocks;
pub mod expr;
pub mod parser;
pub mod resolve;
pub mod tree;

pub use blocks::{Block, ResourceKind, extract_blocks};
pub use parser::{ConfigParser, HclConfigParser, is_config_file};
pub use resolve::{Environment, Interpolator, ResolvedModule};
pub use tree::{Module, OpaqueBlock, Resource, TreeBuilder};
