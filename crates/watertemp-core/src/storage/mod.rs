pub mod record;
pub mod sd_card;
pub mod window;

use thiserror_no_std::Error;

pub use record::{RecordLine, format_record};
pub use sd_card::SdCardMedium;
pub use window::{StorageWindow, WindowEvent, WindowState};

/// Data file in the root directory of the medium (8.3 name for FAT).
pub const DATA_FILE_NAME: &str = "TEMPDATA.CSV";

/// First line written each time the data file is started.
pub const HEADER: &str = "Time, Probe 1 Temp, Probe 2 Temp, Probe 3 Temp";

/// Placeholder written for an absent probe or a missing reading.
pub const MISSING_VALUE: &str = "NULL";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("failed to mount storage medium")]
    MountFailed,
    #[error("failed to open data file")]
    OpenFailed,
    #[error("failed to write data file")]
    WriteFailed,
    #[error("failed to unmount storage medium")]
    UnmountFailed,
    #[error("storage window is closed")]
    WindowClosed,
}

/// Removable storage as provided by the platform.
///
/// Implementations log their own error details before mapping them into
/// [`StorageError`].
pub trait StorageMedium {
    /// Handle to a mounted volume, given back on unmount.
    type Volume;

    fn mount(&mut self) -> Result<Self::Volume, StorageError>;

    /// Open `file_name` for appending, write `line` plus a line separator,
    /// then close the file again.
    fn append_line(
        &mut self,
        volume: &Self::Volume,
        file_name: &str,
        line: &str,
    ) -> Result<(), StorageError>;

    fn unmount(&mut self, volume: Self::Volume) -> Result<(), StorageError>;
}
