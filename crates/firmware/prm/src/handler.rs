//! The PRM handler capability.
//!
//! On the firmware side a handler is an `efiapi` function taking an opaque
//! parameter buffer and the handler's [`PrmContextBuffer`]. In Rust the same
//! contract is expressed as the [`PrmHandler`] trait: a handler that does not
//! implement [`invoke`](PrmHandler::invoke) reports `EFI_UNSUPPORTED`, which
//! is what a platform without the capability returns.

use core::ffi::c_void;

use ember_uefi::{EfiGuid, EfiStatus};

use crate::{PrmContextBuffer, PrmError, PrmHandlerExportDescriptor};

/// Raw handler entry point as exported from a PRM module.
pub type PrmHandlerFn =
    unsafe extern "efiapi" fn(parameter_buffer: *mut c_void, context: *mut PrmContextBuffer) -> EfiStatus;

/// A runtime handler exported by a PRM module.
pub trait PrmHandler {
    /// GUID the OS uses to call this handler.
    fn guid(&self) -> EfiGuid;

    /// Export name of the handler function.
    fn name(&self) -> &str;

    /// Runs the handler.
    fn invoke(&self, parameter: Option<&mut [u8]>, context: Option<&PrmContextBuffer>) -> EfiStatus {
        let _ = (parameter, context);
        EfiStatus::UNSUPPORTED
    }

    /// The export descriptor entry for this handler.
    ///
    /// # Errors
    ///
    /// Returns [`PrmError::InvalidName`] if [`name`](Self::name) cannot be
    /// exported.
    fn descriptor(&self) -> Result<PrmHandlerExportDescriptor, PrmError> {
        PrmHandlerExportDescriptor::try_new(self.guid(), self.name())
    }
}

/// A handler with no implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullPrmHandler {
    /// Handler GUID.
    pub guid: EfiGuid,
    /// Export name.
    pub name: &'static str,
}

impl NullPrmHandler {
    /// Creates a handler that always returns `EFI_UNSUPPORTED`.
    #[must_use]
    pub const fn new(guid: EfiGuid, name: &'static str) -> Self {
        Self { guid, name }
    }
}

impl PrmHandler for NullPrmHandler {
    fn guid(&self) -> EfiGuid {
        self.guid
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Routes a call to the handler registered under `guid`.
///
/// A context, when given, must be valid and name the same handler.
/// Returns `EFI_NOT_FOUND` if no handler matches.
pub fn dispatch(
    handlers: &[&dyn PrmHandler],
    guid: &EfiGuid,
    parameter: Option<&mut [u8]>,
    context: Option<&PrmContextBuffer>,
) -> EfiStatus {
    let Some(handler) = handlers.iter().find(|h| h.guid() == *guid) else {
        log::debug!("prm: no handler for {guid}");
        return EfiStatus::NOT_FOUND;
    };
    if let Some(ctx) = context {
        if let Err(e) = ctx.validate() {
            log::warn!("prm: rejecting context for {}: {e}", handler.name());
            return e.into();
        }
        let context_guid = ctx.handler_guid;
        if context_guid != *guid {
            log::warn!("prm: context names {context_guid}, expected {guid}");
            return EfiStatus::INVALID_PARAMETER;
        }
    }
    log::debug!("prm: invoking {}", handler.name());
    handler.invoke(parameter, context)
}
