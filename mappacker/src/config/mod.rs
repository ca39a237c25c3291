//! Configuration for mappacker components.
//!
//! Two layers:
//!
//! - [`ConfigFile`] - the user's `~/.mappacker/config.ini`, one struct per
//!   `[section]`, parsed over the defaults in [`defaults`]
//! - runtime configs ([`DownloadConfig`], [`RenderConfig`]) - small builder
//!   structs handed to the acquisition and assembly stages
//!
//! # Example
//!
//! ```
//! use mappacker::config::{DownloadConfig, RenderConfig};
//!
//! let download = DownloadConfig::default().with_parallel_downloads(8);
//! let render = RenderConfig::default().with_ratio(2);
//! assert_eq!(download.parallel_downloads(), 8);
//! assert_eq!(render.ratio(), 2);
//! ```

pub mod defaults;
mod download;
mod file;
mod parser;
mod render;
mod settings;
mod writer;

pub use defaults::*;
pub use download::DownloadConfig;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use render::RenderConfig;
pub use settings::*;
