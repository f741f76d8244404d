#![allow(clippy::too_many_arguments)]
#![allow(clippy::new_without_default)]

pub mod image;
pub mod calc;
pub mod errors;
pub mod stat;
pub mod tiles;
pub mod detect;
pub mod background;
pub mod blobs;
pub mod depollute;
pub mod config;
pub mod progress;
pub mod log_utils;
