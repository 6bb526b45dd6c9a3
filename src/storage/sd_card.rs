use esp_idf_svc::fs::fatfs::Fatfs;
use esp_idf_svc::hal::gpio::{AnyIOPin, Gpio12, Gpio13, Gpio14, Gpio15, Gpio2, Gpio4};
use esp_idf_svc::hal::sd::mmc::{SdMmcHostConfiguration, SdMmcHostDriver, SDMMC1};
use esp_idf_svc::hal::sd::{SdCardConfiguration, SdCardDriver};
use esp_idf_svc::io::vfs::MountedFatfs;
use esp_idf_svc::sys;
use log::{error, info, warn};
use std::ffi::{c_void, CStr};
use std::ptr;

use crate::storage::{CardInfo, MountedStore, SdBusWidth, StorageError};

type SdFatfs = Fatfs<SdCardDriver<SdMmcHostDriver<'static>>>;

/// `Fatfs::new_sdcard(0, ..)` で登録する論理ドライブ
const FAT_DRIVE: &CStr = c"0:";
const ALLOCATION_UNIT_SIZE: u32 = 16 * 1024;
const MKFS_WORK_BUFFER_SIZE: usize = 4096;

/// SDMMCスロット1に接続されたSDカード（FATでマウント済み）
///
/// ドロップ時にアンマウントされます。
pub struct SdCard {
    _mounted: MountedFatfs<SdFatfs>,
    store: MountedStore,
    bus_width: SdBusWidth,
    info: CardInfo,
}

impl SdCard {
    /// 1ビットモードでマウント（CLK=GPIO14, CMD=GPIO15, D0=GPIO2）
    ///
    /// GPIO4/12/13 は他用途（人感センサーなど）に使えます。
    pub fn mount_1bit(
        slot: SDMMC1,
        clk: Gpio14,
        cmd: Gpio15,
        d0: Gpio2,
        mount_point: &str,
        max_files: usize,
    ) -> Result<Self, StorageError> {
        info!("SDカード初期化中 (SDMMC 1ビットモード)");
        let host = SdMmcHostDriver::new_1bit(
            slot,
            cmd,
            clk,
            d0,
            None::<AnyIOPin>,
            None::<AnyIOPin>,
            &SdMmcHostConfiguration::new(),
        )
        .map_err(|e| mount_error("SDMMCホストの初期化に失敗", e))?;

        Self::mount(host, SdBusWidth::One, mount_point, max_files)
    }

    /// 4ビットモードでマウント（D1=GPIO4, D2=GPIO12, D3=GPIO13 を追加使用）
    #[allow(clippy::too_many_arguments)]
    pub fn mount_4bit(
        slot: SDMMC1,
        clk: Gpio14,
        cmd: Gpio15,
        d0: Gpio2,
        d1: Gpio4,
        d2: Gpio12,
        d3: Gpio13,
        mount_point: &str,
        max_files: usize,
    ) -> Result<Self, StorageError> {
        info!("SDカード初期化中 (SDMMC 4ビットモード)");
        let host = SdMmcHostDriver::new_4bits(
            slot,
            cmd,
            clk,
            d0,
            d1,
            d2,
            d3,
            None::<AnyIOPin>,
            None::<AnyIOPin>,
            &SdMmcHostConfiguration::new(),
        )
        .map_err(|e| mount_error("SDMMCホストの初期化に失敗", e))?;

        Self::mount(host, SdBusWidth::Four, mount_point, max_files)
    }

    fn mount(
        host: SdMmcHostDriver<'static>,
        bus_width: SdBusWidth,
        mount_point: &str,
        max_files: usize,
    ) -> Result<Self, StorageError> {
        let card = SdCardDriver::new_mmc(host, &SdCardConfiguration::new())
            .map_err(|e| mount_error("SDカードの検出に失敗", e))?;
        let info = card_info(card.card());

        info!("ファイルシステムをマウント中: {}", mount_point);
        let fatfs = Fatfs::new_sdcard(0, card).map_err(|e| mount_error("FATの初期化に失敗", e))?;
        let mounted = MountedFatfs::mount(fatfs, mount_point, max_files).map_err(|e| {
            mount_error(
                "ファイルシステムのマウントに失敗。カードがFATでフォーマットされているか確認してください",
                e,
            )
        })?;
        info!(
            "SDカードをマウントしました: {} ({}ビット, 最大{}ファイル)",
            mount_point,
            bus_width.lines(),
            max_files
        );
        info!("SDカード情報: {}", info);

        Ok(Self {
            _mounted: mounted,
            store: MountedStore::new(mount_point),
            bus_width,
            info,
        })
    }

    pub fn card_info(&self) -> &CardInfo {
        &self.info
    }

    /// FATボリュームを読めるか確認します
    ///
    /// マウントは遅延されるため、ここで初めてボリュームの検証が走ります。
    pub fn volume_readable(&self) -> bool {
        let mut free_clusters: u32 = 0;
        let mut fs: *mut sys::FATFS = ptr::null_mut();
        let res = unsafe { sys::f_getfree(FAT_DRIVE.as_ptr(), &mut free_clusters, &mut fs) };
        if res == sys::FRESULT_FR_OK {
            info!("SDカードの空きクラスタ数: {}", free_clusters);
            true
        } else {
            warn!("FATボリュームを読めません (FRESULT={})", res);
            false
        }
    }

    /// カード全体をFATでフォーマットします。保存済みのファイルはすべて消えます
    ///
    /// マウントは維持され、次のファイル操作で新しいボリュームが読み込まれます。
    pub fn format(&self) -> Result<(), StorageError> {
        info!("SDカードをフォーマットします: {}", self.store.root().display());
        let params = sys::MKFS_PARM {
            fmt: sys::FM_ANY as u8,
            n_fat: 0,
            align: 0,
            n_root: 0,
            au_size: ALLOCATION_UNIT_SIZE,
        };
        let mut work = vec![0u8; MKFS_WORK_BUFFER_SIZE];
        let res = unsafe {
            sys::f_mkfs(
                FAT_DRIVE.as_ptr(),
                &params,
                work.as_mut_ptr() as *mut c_void,
                work.len() as u32,
            )
        };
        if res != sys::FRESULT_FR_OK {
            error!("SDカードのフォーマットに失敗しました (FRESULT={})", res);
            return Err(StorageError::Format(format!("FRESULT={}", res)));
        }
        info!("SDカードのフォーマットが完了しました");
        Ok(())
    }

    /// マウントポイント配下のファイルストア
    pub fn store(&self) -> &MountedStore {
        &self.store
    }

    pub fn bus_width(&self) -> SdBusWidth {
        self.bus_width
    }
}

impl Drop for SdCard {
    fn drop(&mut self) {
        info!("SDカードをアンマウントします: {}", self.store.root().display());
    }
}

fn card_info(card: &sys::sdmmc_card_t) -> CardInfo {
    let name: Vec<u8> = card.cid.name.iter().map(|&c| c as u8).collect();
    CardInfo {
        name: CardInfo::name_from_cid(&name),
        sector_count: u64::try_from(card.csd.capacity).unwrap_or(0),
        sector_size: u32::try_from(card.csd.sector_size).unwrap_or(0),
        max_freq_khz: card.max_freq_khz,
    }
}

fn mount_error(context: &str, err: esp_idf_svc::sys::EspError) -> StorageError {
    error!("{}: {:?}", context, err);
    StorageError::Mount(format!("{}: {}", context, err))
}
