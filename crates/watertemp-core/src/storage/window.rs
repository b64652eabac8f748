//! Bounded mount window for the removable medium
//!
//! The medium is only mounted while the window is open. The window opens at
//! startup, writes the header, and closes after a fixed number of ticks so
//! the card is not left mounted across an abrupt power loss.

use log::{error, info};

use super::{DATA_FILE_NAME, HEADER, StorageError, StorageMedium};
use crate::config::WindowPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Open,
    Closed,
}

/// Window transition caused by [`StorageWindow::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Closed,
    Reopened,
}

pub struct StorageWindow<M: StorageMedium> {
    medium: M,
    volume: Option<M::Volume>,
    policy: WindowPolicy,
    /// Ticks since the window last opened or closed
    ticks_in_state: u32,
}

impl<M: StorageMedium> StorageWindow<M> {
    /// Mount the medium and write the header as the first line.
    pub fn open(mut medium: M, policy: WindowPolicy) -> Result<Self, StorageError> {
        let volume = medium.mount()?;
        info!("Filesystem mounted");

        if let Err(e) = medium.append_line(&volume, DATA_FILE_NAME, HEADER) {
            error!("Failed to write header to {}: {}", DATA_FILE_NAME, e);
            // Leave the medium unmounted; the header error is what matters here
            let _ = medium.unmount(volume);
            return Err(e);
        }

        Ok(Self {
            medium,
            volume: Some(volume),
            policy,
            ticks_in_state: 0,
        })
    }

    pub fn state(&self) -> WindowState {
        if self.volume.is_some() {
            WindowState::Open
        } else {
            WindowState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.volume.is_some()
    }

    /// Append one record. Rejected without touching the medium while closed.
    pub fn append(&mut self, line: &str) -> Result<(), StorageError> {
        let Some(volume) = self.volume.as_ref() else {
            return Err(StorageError::WindowClosed);
        };
        self.medium.append_line(volume, DATA_FILE_NAME, line)
    }

    /// Unmount the medium. Closing a closed window does nothing.
    pub fn close(&mut self) -> Result<(), StorageError> {
        let Some(volume) = self.volume.take() else {
            return Ok(());
        };
        self.ticks_in_state = 0;
        self.medium.unmount(volume)?;
        info!("Card unmounted, safe to remove");
        Ok(())
    }

    /// Advance the wear policy by one tick.
    ///
    /// Closes the window once it has been open for `close_after_ticks`
    /// ticks, and reopens it after `reopen_after_ticks` closed ticks if the
    /// policy allows. A reopened window continues the same data file without
    /// a new header.
    pub fn tick(&mut self) -> Result<Option<WindowEvent>, StorageError> {
        self.ticks_in_state = self.ticks_in_state.saturating_add(1);

        if self.is_open() {
            if self.ticks_in_state >= self.policy.close_after_ticks {
                self.close()?;
                return Ok(Some(WindowEvent::Closed));
            }
            return Ok(None);
        }

        match self.policy.reopen_after_ticks {
            Some(after) if self.ticks_in_state >= after => {
                // Start a fresh wait whether or not the remount works
                self.ticks_in_state = 0;
                let volume = self.medium.mount()?;
                info!("Filesystem remounted");
                self.volume = Some(volume);
                Ok(Some(WindowEvent::Reopened))
            }
            _ => Ok(None),
        }
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }
}
