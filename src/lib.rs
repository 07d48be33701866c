pub mod config;
pub mod constants;
pub mod distro;
pub mod fs;
pub mod hostname;
pub mod init;
pub mod interfaces;
pub mod keys;
pub mod lock;
pub mod logger;
pub mod metadata;
pub mod network;
pub mod probe;
pub mod render;
pub mod writer;
