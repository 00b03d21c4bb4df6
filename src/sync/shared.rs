//! ISR-reachable storage for the completion handler.
//!
//! The DMA transfer-complete interrupt has no arguments, so the
//! [`CompletionHandle`] must be parked somewhere static for it to find.
//! [`SharedCompletion`] is that place.

use super::primitives::CriticalSectionCell;
use crate::driver::error::{ConfigError, ConfigResult};
use crate::driver::slots::{BufferSlots, CompletionHandle};

/// Static slot holding the completion handler for the interrupt.
///
/// # Example
///
/// ```ignore
/// static SLOTS: BufferSlots = BufferSlots::new();
/// static COMPLETION: SharedCompletion = SharedCompletion::new();
///
/// COMPLETION.register(&SLOTS).unwrap();
///
/// #[interrupt]
/// fn DMA2_CH1() {
///     // clear the transfer-complete flag, then:
///     COMPLETION.notify();
/// }
/// ```
pub struct SharedCompletion {
    inner: CriticalSectionCell<Option<CompletionHandle<'static>>>,
}

impl SharedCompletion {
    /// Create an empty holder (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(None),
        }
    }

    /// Take the completion handler from `slots` and park it here.
    ///
    /// Fails if the handler was already taken, here or elsewhere.
    pub fn register(&self, slots: &'static BufferSlots) -> ConfigResult<()> {
        let handle = slots.register_completion_handler()?;
        self.install(handle)
    }

    /// Park an already-obtained handler.
    pub fn install(&self, handle: CompletionHandle<'static>) -> ConfigResult<()> {
        self.inner.with(|slot| {
            if slot.is_some() {
                return Err(ConfigError::HandlerAlreadyRegistered);
            }
            *slot = Some(handle);
            Ok(())
        })
    }

    /// Whether a handler is parked
    pub fn is_registered(&self) -> bool {
        self.inner.with(|slot| slot.is_some())
    }

    /// Run the transfer-complete callback. Call from the DMA interrupt.
    ///
    /// Returns `false` if no handler was registered (spurious interrupt).
    #[inline]
    pub fn notify(&self) -> bool {
        self.inner.with(|slot| match slot {
            Some(handle) => {
                handle.on_transfer_complete();
                true
            }
            None => false,
        })
    }
}

impl Default for SharedCompletion {
    fn default() -> Self {
        Self::new()
    }
}
