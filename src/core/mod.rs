pub mod connection;
pub mod error;
pub mod feature;
pub mod hierarchy;
pub mod matcher;
pub mod metadata;
pub mod registry;
pub mod session;
pub mod tree;
pub mod types;
