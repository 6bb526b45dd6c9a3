/// マウント済みファイルシステム上のファイル操作
pub mod file_store;
/// SDカード(SDMMC + FAT)のマウント（実機のみ）
#[cfg(feature = "esp")]
pub mod sd_card;

pub use file_store::{MountedStore, LINE_BUFFER_SIZE};
#[cfg(feature = "esp")]
pub use sd_card::SdCard;

use std::path::PathBuf;

/// SDMMCバス幅
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdBusWidth {
    One,
    Four,
}

impl SdBusWidth {
    pub fn lines(self) -> u8 {
        match self {
            SdBusWidth::One => 1,
            SdBusWidth::Four => 4,
        }
    }
}

/// ストレージ操作エラー
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("ファイルを開けません: {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ファイル書き込みに失敗: {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ファイル読み込みに失敗: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SDカードのマウントに失敗: {0}")]
    Mount(String),

    #[error("SDカードのフォーマットに失敗: {0}")]
    Format(String),
}

/// マウントしたカードの識別情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    pub name: String,
    pub sector_count: u64,
    pub sector_size: u32,
    pub max_freq_khz: u32,
}

impl CardInfo {
    /// CIDの製品名フィールド（NUL終端、最大8バイト）から名前を取り出す
    pub fn name_from_cid(raw: &[u8]) -> String {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).trim().to_string()
    }

    pub fn capacity_mb(&self) -> u64 {
        self.sector_count * u64::from(self.sector_size) / (1024 * 1024)
    }
}

impl std::fmt::Display for CardInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "名前: {}, 容量: {}MB, セクタ: {}B, 最大速度: {}kHz",
            self.name,
            self.capacity_mb(),
            self.sector_size,
            self.max_freq_khz
        )
    }
}

/// マウント後にFATでフォーマットする条件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatPolicy {
    /// 起動のたびにフォーマットする
    pub on_boot: bool,
    /// ファイルシステムを読めないときだけフォーマットする
    pub if_unreadable: bool,
}

impl FormatPolicy {
    pub fn needs_format(&self, volume_readable: bool) -> bool {
        self.on_boot || (self.if_unreadable && !volume_readable)
    }
}

/// 保存先ファイルストア
///
/// `name` はストアのルート（マウントポイント）からの相対ファイル名です。
pub trait FileStore {
    /// バイナリを書き込み、書き込んだファイルのパスを返す
    fn write_binary(&self, name: &str, data: &[u8]) -> Result<PathBuf, StorageError>;

    /// テキストを書き込み、書き込んだファイルのパスを返す
    fn write_text(&self, name: &str, text: &str) -> Result<PathBuf, StorageError>;

    /// 先頭行を改行を除いて読み込む
    fn read_first_line(&self, name: &str) -> Result<String, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_name_stops_at_nul() {
        assert_eq!(CardInfo::name_from_cid(b"SD32G\0\0\0"), "SD32G");
        assert_eq!(CardInfo::name_from_cid(b"ABCDEFGH"), "ABCDEFGH");
        assert_eq!(CardInfo::name_from_cid(&[0; 8]), "");
    }

    #[test]
    fn card_info_reports_capacity_in_mb() {
        let info = CardInfo {
            name: "SD32G".to_string(),
            sector_count: 62_333_952,
            sector_size: 512,
            max_freq_khz: 20_000,
        };
        assert_eq!(info.capacity_mb(), 30_436);

        let line = info.to_string();
        assert!(line.contains("SD32G"));
        assert!(line.contains("30436MB"));
        assert!(line.contains("20000kHz"));
    }

    #[test]
    fn format_policy_defaults_to_never() {
        let policy = FormatPolicy::default();
        assert!(!policy.needs_format(true));
        assert!(!policy.needs_format(false));
    }

    #[test]
    fn format_on_boot_ignores_volume_state() {
        let policy = FormatPolicy {
            on_boot: true,
            if_unreadable: false,
        };
        assert!(policy.needs_format(true));
        assert!(policy.needs_format(false));
    }

    #[test]
    fn format_if_unreadable_only_hits_broken_volumes() {
        let policy = FormatPolicy {
            on_boot: false,
            if_unreadable: true,
        };
        assert!(!policy.needs_format(true));
        assert!(policy.needs_format(false));
    }
}
