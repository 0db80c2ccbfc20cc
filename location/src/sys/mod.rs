//! Platform-specific location backends.
//!
//! The controller itself is platform-agnostic; anything that talks to a
//! real location-services client lives here behind
//! [`LocationBackend`](crate::backend::LocationBackend).

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "android")]
pub use android::AndroidLocationBackend;
