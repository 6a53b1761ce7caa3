//! Sealed trait marker for [`Transport`](super::Transport) implementations.
//!
//! Gateway credentials and bearer tokens travel through every transport, so only
//! implementations inside this crate are allowed.

pub(crate) mod private {
    /// Sealed trait marker.
    pub trait Sealed {}
}
