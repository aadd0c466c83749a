//! UEFI status codes.
//!
//! [`EfiStatus`] is the `EFI_STATUS` / `RETURN_STATUS` word every firmware
//! routine returns. The high bit separates errors from warnings; zero is
//! success.

use core::fmt;

/// The high bit of `usize`, used to distinguish error codes from warnings.
const ERROR_BIT: usize = 1 << (usize::BITS - 1);

/// A UEFI status code.
///
/// Transparent over `usize` so it can cross an `efiapi` boundary unchanged.
/// Library errors in this workspace convert into it with `From`, which is how
/// a Rust `Result` is flattened back into the firmware calling convention.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EfiStatus(pub usize);

/// Declares the status constants together with their `EFI_*` names.
macro_rules! status_codes {
    ($( $(#[$doc:meta])* $name:ident = $value:expr, $text:literal; )*) => {
        impl EfiStatus {
            $(
                $(#[$doc])*
                pub const $name: Self = Self($value);
            )*

            /// Returns the `EFI_*` name of the status code, if it is a known one.
            #[must_use]
            pub const fn name(self) -> Option<&'static str> {
                $(
                    if self.0 == $value {
                        return Some($text);
                    }
                )*
                None
            }
        }
    };
}

status_codes! {
    /// The operation completed successfully.
    SUCCESS = 0, "EFI_SUCCESS";

    /// The string contained characters that could not be rendered.
    WARN_UNKNOWN_GLYPH = 1, "EFI_WARN_UNKNOWN_GLYPH";
    /// The handle was closed, but the file was not deleted.
    WARN_DELETE_FAILURE = 2, "EFI_WARN_DELETE_FAILURE";
    /// The handle was closed, but the data was not flushed properly.
    WARN_WRITE_FAILURE = 3, "EFI_WARN_WRITE_FAILURE";
    /// The resulting buffer was too small, and the data was truncated.
    WARN_BUFFER_TOO_SMALL = 4, "EFI_WARN_BUFFER_TOO_SMALL";
    /// The data has not been updated within the timeframe set by local policy.
    WARN_STALE_DATA = 5, "EFI_WARN_STALE_DATA";
    /// The resulting buffer contains a UEFI-compliant file system.
    WARN_FILE_SYSTEM = 6, "EFI_WARN_FILE_SYSTEM";
    /// The operation will be processed across a system reset.
    WARN_RESET_REQUIRED = 7, "EFI_WARN_RESET_REQUIRED";

    /// The image failed to load.
    LOAD_ERROR = ERROR_BIT | 1, "EFI_LOAD_ERROR";
    /// A parameter was incorrect.
    INVALID_PARAMETER = ERROR_BIT | 2, "EFI_INVALID_PARAMETER";
    /// The operation is not supported.
    UNSUPPORTED = ERROR_BIT | 3, "EFI_UNSUPPORTED";
    /// The buffer was not the proper size for the request.
    BAD_BUFFER_SIZE = ERROR_BIT | 4, "EFI_BAD_BUFFER_SIZE";
    /// The buffer is not large enough to hold the requested data.
    BUFFER_TOO_SMALL = ERROR_BIT | 5, "EFI_BUFFER_TOO_SMALL";
    /// There is no data pending upon return.
    NOT_READY = ERROR_BIT | 6, "EFI_NOT_READY";
    /// The physical device reported an error while attempting the operation.
    DEVICE_ERROR = ERROR_BIT | 7, "EFI_DEVICE_ERROR";
    /// The device cannot be written to.
    WRITE_PROTECTED = ERROR_BIT | 8, "EFI_WRITE_PROTECTED";
    /// A resource has run out.
    OUT_OF_RESOURCES = ERROR_BIT | 9, "EFI_OUT_OF_RESOURCES";
    /// An inconsistency was detected on the file system.
    VOLUME_CORRUPTED = ERROR_BIT | 0x0a, "EFI_VOLUME_CORRUPTED";
    /// There is no more space on the file system.
    VOLUME_FULL = ERROR_BIT | 0x0b, "EFI_VOLUME_FULL";
    /// The device does not contain any medium.
    NO_MEDIA = ERROR_BIT | 0x0c, "EFI_NO_MEDIA";
    /// The medium in the device has changed since the last access.
    MEDIA_CHANGED = ERROR_BIT | 0x0d, "EFI_MEDIA_CHANGED";
    /// The item was not found.
    NOT_FOUND = ERROR_BIT | 0x0e, "EFI_NOT_FOUND";
    /// Access was denied.
    ACCESS_DENIED = ERROR_BIT | 0x0f, "EFI_ACCESS_DENIED";
    /// The server was not found or did not respond.
    NO_RESPONSE = ERROR_BIT | 0x10, "EFI_NO_RESPONSE";
    /// A mapping to a device does not exist.
    NO_MAPPING = ERROR_BIT | 0x11, "EFI_NO_MAPPING";
    /// The timeout time expired.
    TIMEOUT = ERROR_BIT | 0x12, "EFI_TIMEOUT";
    /// The protocol has not been started.
    NOT_STARTED = ERROR_BIT | 0x13, "EFI_NOT_STARTED";
    /// The protocol has already been started.
    ALREADY_STARTED = ERROR_BIT | 0x14, "EFI_ALREADY_STARTED";
    /// The operation was aborted.
    ABORTED = ERROR_BIT | 0x15, "EFI_ABORTED";
    /// The function encountered an internal version that was incompatible.
    INCOMPATIBLE_VERSION = ERROR_BIT | 0x19, "EFI_INCOMPATIBLE_VERSION";
    /// The function was not performed due to a security violation.
    SECURITY_VIOLATION = ERROR_BIT | 0x1a, "EFI_SECURITY_VIOLATION";
    /// A CRC error was detected.
    CRC_ERROR = ERROR_BIT | 0x1b, "EFI_CRC_ERROR";
    /// The end of the file was reached.
    END_OF_FILE = ERROR_BIT | 0x1f, "EFI_END_OF_FILE";
    /// The security status of the data is unknown or compromised.
    COMPROMISED_DATA = ERROR_BIT | 0x21, "EFI_COMPROMISED_DATA";
}

impl EfiStatus {
    /// Returns `true` if this status code indicates success.
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this status code indicates an error (high bit set).
    #[inline]
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 & ERROR_BIT != 0
    }

    /// Returns `true` for non-zero codes with the high bit clear.
    #[inline]
    #[must_use]
    pub const fn is_warning(self) -> bool {
        !self.is_success() && !self.is_error()
    }

    /// Converts this status code to a `Result`; warnings count as success.
    ///
    /// # Errors
    ///
    /// Returns `Err(self)` if the high bit is set.
    #[inline]
    pub const fn to_result(self) -> Result<(), Self> {
        if self.is_error() { Err(self) } else { Ok(()) }
    }

    /// Flattens a `Result` whose error converts into a status code.
    #[must_use]
    pub fn from_result<E: Into<Self>>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::SUCCESS,
            Err(e) => e.into(),
        }
    }
}

impl fmt::Debug for EfiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "EfiStatus({name})"),
            None => write!(f, "EfiStatus({:#x})", self.0),
        }
    }
}

impl fmt::Display for EfiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None if self.is_error() => {
                write!(f, "unknown error ({:#x})", self.0 & !ERROR_BIT)
            }
            None => write!(f, "unknown warning ({})", self.0),
        }
    }
}

impl core::error::Error for EfiStatus {}
