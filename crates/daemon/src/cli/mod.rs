pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Actions, Cluster, Content, Daemon, Health, Init, Reference, Value, Version};
