use std::fmt;
use std::str::FromStr;

/// MACアドレス解析エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacAddressError {
    #[error("MACアドレスの形式が不正です: '{0}' (xx:xx:xx:xx:xx:xx 形式で6要素が必要)")]
    InvalidFormat(String),

    #[error("16進数として解析できません: '{0}'")]
    InvalidHex(String),
}

/// 6バイトのハードウェアアドレス（BSSID / メッシュノードアドレス）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub(crate) [u8; 6]);

impl MacAddress {
    /// 全ゼロアドレス（未設定を表す）
    pub const ZERO: MacAddress = MacAddress([0u8; 6]);

    /// バイト配列からMACアドレスを作成
    pub const fn new(addr: [u8; 6]) -> Self {
        MacAddress(addr)
    }

    /// 先頭6バイトからMACアドレスを作成します。6バイト未満なら `None`
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let addr: [u8; 6] = bytes.get(..6)?.try_into().ok()?;
        Some(MacAddress(addr))
    }

    /// 生のバイト列
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// 全ゼロかどうか
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 6]
    }
}

impl FromStr for MacAddress {
    type Err = MacAddressError;

    /// "xx:xx:xx:xx:xx:xx" 形式の文字列から生成します
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(MacAddressError::InvalidFormat(s.to_string()));
        }

        let mut mac = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() || part.len() > 2 {
                return Err(MacAddressError::InvalidHex(part.to_string()));
            }
            mac[i] = u8::from_str_radix(part, 16)
                .map_err(|_| MacAddressError::InvalidHex(part.to_string()))?;
        }

        Ok(MacAddress(mac))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(addr: [u8; 6]) -> Self {
        MacAddress(addr)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_address_from_str() {
        let mac: MacAddress = "11:22:33:44:55:66".parse().unwrap();
        assert_eq!(mac.octets(), [0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    }

    #[test]
    fn test_mac_address_from_str_mixed_case() {
        let mac: MacAddress = "Aa:Bb:Cc:Dd:Ee:Ff".parse().unwrap();
        assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_mac_address_from_str_invalid_format() {
        assert_eq!(
            "11:22:33:44:55".parse::<MacAddress>(),
            Err(MacAddressError::InvalidFormat("11:22:33:44:55".to_string()))
        );
        assert!("11:22:33:44:55:66:77".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_mac_address_from_str_invalid_hex() {
        assert_eq!(
            "GG:22:33:44:55:66".parse::<MacAddress>(),
            Err(MacAddressError::InvalidHex("GG".to_string()))
        );
        assert!("123:22:33:44:55:66".parse::<MacAddress>().is_err());
        assert!(":22:33:44:55:66".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_mac_address_display_is_uppercase() {
        let mac = MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x0F]);
        assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:0F");
    }

    #[test]
    fn test_mac_address_from_slice() {
        let bytes = [1, 2, 3, 4, 5, 6, 7];
        assert_eq!(
            MacAddress::from_slice(&bytes),
            Some(MacAddress::new([1, 2, 3, 4, 5, 6]))
        );
        assert_eq!(MacAddress::from_slice(&bytes[..5]), None);
    }

    #[test]
    fn test_mac_address_zero() {
        assert!(MacAddress::ZERO.is_zero());
        assert!(MacAddress::default().is_zero());
        assert!(!MacAddress::new([0, 0, 0, 0, 0, 1]).is_zero());
    }
}
