pub mod runner;
pub mod settings_file;
pub mod udp;

pub use runner::*;
pub use settings_file::*;
pub use udp::*;
