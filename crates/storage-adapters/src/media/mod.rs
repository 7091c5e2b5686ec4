//! Media storage backends.

#[cfg(feature = "media-local")]
pub mod local;
