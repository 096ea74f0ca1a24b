//! # Extension Traits
//!
//! Lifecycle interface an extension exposes to the host viewer. The host
//! keeps the extension behind an `Rc` and calls into it from its event and
//! render callbacks, so every method takes `&self`; long-running work is
//! expressed as futures that may be in flight while frames keep updating.
//!
//! ## Lifecycle
//!
//! 1. **Load** - the host registers the extension
//! 2. **Event / Update Loop** - host events and one `update` per frame
//! 3. **Unload** - the host removes the extension; it restores the scene

use crate::host::HostEvent;

/// Hooks the host viewer calls on a registered extension
pub trait ViewerExtension {
    /// Name used for logging and the host's extension list
    fn name(&self) -> &str;

    /// Called once when the host registers the extension.
    ///
    /// # Returns
    ///
    /// `true` when the extension is ready to be used
    fn load(&self) -> bool;

    /// Called when the host removes the extension
    fn unload(&self);

    /// Advance time-dependent state by `delta_time` seconds.
    ///
    /// # Returns
    ///
    /// `true` while the extension still needs frames (an animation runs)
    fn update(&self, delta_time: f32) -> bool;

    /// React to a scene mutation or UI signal from the host
    fn on_host_event(&self, _event: HostEvent) {
        // Default: ignore host events
    }
}
