pub mod addon;
pub mod audio;
pub mod host;
pub mod overlay;
