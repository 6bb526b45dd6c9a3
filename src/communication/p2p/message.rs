use std::fmt::{self, Write};

/// 送信メッセージバッファの容量（バイト）
pub const MESSAGE_CAPACITY: usize = 64;

/// 送信カウンタを埋め込んだ固定長メッセージ
///
/// 送信のたびに作り直され、保存はされません。
#[derive(Clone)]
pub struct OutboundMessage {
    buf: [u8; MESSAGE_CAPACITY],
    len: usize,
}

impl OutboundMessage {
    /// `"mesh-cam p2p #<counter>"` 形式のメッセージを生成
    pub fn for_counter(counter: u32) -> Self {
        let mut message = Self {
            buf: [0; MESSAGE_CAPACITY],
            len: 0,
        };
        // u32 の最大桁数でも容量内に収まる
        let _ = write!(message, "mesh-cam p2p #{}", counter);
        message
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Write for OutboundMessage {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > MESSAGE_CAPACITY {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

impl fmt::Debug for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OutboundMessage").field(&self.as_str()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_decimal_counter() {
        assert_eq!(OutboundMessage::for_counter(1).as_str(), "mesh-cam p2p #1");
        assert_eq!(OutboundMessage::for_counter(250).as_str(), "mesh-cam p2p #250");
    }

    #[test]
    fn max_counter_fits_in_buffer() {
        let message = OutboundMessage::for_counter(u32::MAX);
        assert_eq!(message.as_str(), "mesh-cam p2p #4294967295");
        assert!(message.len() <= MESSAGE_CAPACITY);
    }

    #[test]
    fn overflowing_write_is_rejected() {
        let mut message = OutboundMessage::for_counter(7);
        let long = "x".repeat(MESSAGE_CAPACITY);
        assert!(message.write_str(&long).is_err());
        assert_eq!(message.as_str(), "mesh-cam p2p #7");
    }
}
