use embedded_sdmmc::{
    BlockDevice, Mode, RawDirectory, RawFile, RawVolume, TimeSource, VolumeIdx, VolumeManager,
};
use log::{debug, error};

use super::{StorageError, StorageMedium};

type SdError<B> = embedded_sdmmc::Error<<B as BlockDevice>::Error>;

/// FAT-formatted removable medium behind `embedded-sdmmc`.
///
/// Works with any block device: the SD card over SPI on the device, or a
/// disk image on the host. These operations are blocking, as are the
/// display updates sharing the same SPI bus on the device.
pub struct SdCardMedium<B, T>
where
    B: BlockDevice,
    T: TimeSource,
{
    volume_mgr: VolumeManager<B, T, 4, 4, 1>,
}

impl<B, T> SdCardMedium<B, T>
where
    B: BlockDevice,
    T: TimeSource,
{
    pub fn new(block_device: B, ts: T) -> Self {
        let volume_mgr = VolumeManager::new(block_device, ts);

        Self { volume_mgr }
    }

    fn write_line(&self, file: RawFile, line: &str) -> Result<(), SdError<B>> {
        self.volume_mgr.write(file, line.as_bytes())?;
        self.volume_mgr.write(file, b"\n")
    }

    /// Close the file and its directory even when the write failed, so the
    /// handles are returned to the volume manager.
    fn close_handles(&self, file: RawFile, dir: RawDirectory) -> Result<(), SdError<B>> {
        let file_result = self.volume_mgr.close_file(file);
        let dir_result = self.volume_mgr.close_dir(dir);
        file_result.and(dir_result)
    }
}

impl<B, T> StorageMedium for SdCardMedium<B, T>
where
    B: BlockDevice,
    T: TimeSource,
{
    type Volume = RawVolume;

    fn mount(&mut self) -> Result<RawVolume, StorageError> {
        self.volume_mgr.open_raw_volume(VolumeIdx(0)).map_err(|e| {
            error!("Failed to mount filesystem: {:?}", e);
            StorageError::MountFailed
        })
    }

    fn append_line(
        &mut self,
        volume: &RawVolume,
        file_name: &str,
        line: &str,
    ) -> Result<(), StorageError> {
        debug!("Opening file {}", file_name);
        let dir = self.volume_mgr.open_root_dir(*volume).map_err(|e| {
            error!("Failed to open root directory: {:?}", e);
            StorageError::OpenFailed
        })?;

        let file = match self
            .volume_mgr
            .open_file_in_dir(dir, file_name, Mode::ReadWriteCreateOrAppend)
        {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to open {} for writing: {:?}", file_name, e);
                let _ = self.volume_mgr.close_dir(dir);
                return Err(StorageError::OpenFailed);
            }
        };

        let written = self.write_line(file, line);
        let closed = self.close_handles(file, dir);

        written.map_err(|e| {
            error!("Failed to write {}: {:?}", file_name, e);
            StorageError::WriteFailed
        })?;
        closed.map_err(|e| {
            error!("Failed to close {}: {:?}", file_name, e);
            StorageError::WriteFailed
        })?;

        debug!("File written");
        Ok(())
    }

    fn unmount(&mut self, volume: RawVolume) -> Result<(), StorageError> {
        self.volume_mgr.close_volume(volume).map_err(|e| {
            error!("Failed to unmount filesystem: {:?}", e);
            StorageError::UnmountFailed
        })
    }
}
