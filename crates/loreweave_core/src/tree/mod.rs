//! Pure tree algorithms over playground nodes.
//!
//! # Responsibility
//! - Build the nested forest from a flat node list.
//! - Resolve the nearest `setting` ancestor for toolbox inheritance.
//! - Filter the forest by text query.
//!
//! Nothing here touches storage; inputs may be partial or malformed.

pub mod builder;
pub mod filter;
pub mod resolver;
