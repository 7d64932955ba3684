//! Speech-to-text port and upload validation.

pub mod audio;
pub mod box_provider;
pub mod provider;
