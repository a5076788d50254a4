//! Batch downloader for NeuroVault statistical maps.
//!
//! Each image id goes through one linear pipeline: fetch the metadata page,
//! read the asset URL and title, then download, gunzip and store the asset
//! under `<output_dir>/s<subject>/sess<session>-<title>.nii`.

pub mod config;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod utils;
