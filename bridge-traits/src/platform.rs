//! Platform-specific helper abstractions used to keep trait bounds aligned with
//! the threading guarantees of each target.
//!
//! Native targets require `Send + Sync` to allow bridge implementations to be
//! shared freely across async tasks. WebAssembly builds, however, run entirely
//! on a single thread and cannot satisfy those bounds because browser-provided
//! objects are not thread-safe. The helper traits below make the required
//! bounds conditional without duplicating every trait definition.

/// Marker trait that applies `Send + Sync` on native targets while becoming a
/// no-op on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}

/// Marker trait equivalent to `Send` on native targets.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSend: Send {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSend for T where T: Send {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSend {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSend for T {}

/// Capabilities the host declares once at engine construction.
///
/// The engine never branches on platform identity at call sites; every
/// platform difference is either a strategy selected from this profile or a
/// separate trait implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Constrained-bandwidth hosts (mobile webviews) report media readiness
    /// optimistically; the transport selects a buffer-gated start strategy
    /// for them instead of trusting a single can-play-through signal.
    pub constrained_bandwidth: bool,
    /// Whether audio URLs must be rewritten through a local proxy before the
    /// media element can load them (CORS-restricted hosts).
    pub requires_stream_proxy: bool,
}

impl PlatformProfile {
    /// Profile for an unconstrained desktop host.
    pub fn desktop() -> Self {
        Self {
            constrained_bandwidth: false,
            requires_stream_proxy: true,
        }
    }

    /// Profile for a constrained mobile webview host.
    pub fn mobile() -> Self {
        Self {
            constrained_bandwidth: true,
            requires_stream_proxy: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_differ_on_buffering() {
        assert!(!PlatformProfile::desktop().constrained_bandwidth);
        assert!(PlatformProfile::mobile().constrained_bandwidth);
    }
}
