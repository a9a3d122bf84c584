pub mod actions;
pub mod cluster;
pub mod content;
pub mod daemon;
pub mod health;
pub mod init;
pub mod reference;
pub mod value;
pub mod version;

pub use actions::Actions;
pub use cluster::Cluster;
pub use content::Content;
pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use reference::Reference;
pub use value::Value;
pub use version::Version;
