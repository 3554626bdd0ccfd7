//! Framing for the `|#|`-delimited JSON stream.
//!
//! Every frame is one JSON object followed by the delimiter. TCP is free to split or
//! merge frames across reads, so [`FrameCodec`] keeps whatever follows the last
//! delimiter and prefixes it to the next chunk.

use crate::protocol::Message;
use thiserror::Error;

pub const DELIMITER: &[u8] = b"|#|";

/// Upper bound on buffered bytes that have not yet seen a delimiter.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed frame: {0}")]
    Decode(serde_json::Error),
    #[error("failed to encode {tag}: {source}")]
    Encode {
        tag: &'static str,
        source: serde_json::Error,
    },
    #[error("{len} bytes buffered without a frame delimiter (limit {limit})")]
    FrameTooLarge { len: usize, limit: usize },
}

/// Stateful decoder for one connection, plus the stateless encoder.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: Vec<u8>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes one message into a complete frame.
    ///
    /// `|` only ever appears inside JSON strings, so escaping it as `\u007c` keeps the
    /// delimiter out of the payload without changing what decodes.
    pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
        let json = serde_json::to_string(message).map_err(|source| CodecError::Encode {
            tag: message.tag(),
            source,
        })?;
        let mut frame = json.replace('|', "\\u007c").into_bytes();
        frame.extend_from_slice(DELIMITER);
        Ok(frame)
    }

    /// Appends raw bytes read from the socket.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pops the next complete message, if one is buffered.
    ///
    /// Empty frames are skipped. An error means the stream is unusable and the
    /// connection should be dropped.
    pub fn next_message(&mut self) -> Result<Option<Message>, CodecError> {
        loop {
            let Some(end) = find_delimiter(&self.buffer) else {
                if self.buffer.len() > MAX_FRAME_LEN {
                    return Err(CodecError::FrameTooLarge {
                        len: self.buffer.len(),
                        limit: MAX_FRAME_LEN,
                    });
                }
                return Ok(None);
            };

            let frame: Vec<u8> = self.buffer.drain(..end + DELIMITER.len()).collect();
            let text = std::str::from_utf8(&frame[..end])?;
            if text.trim().is_empty() {
                continue;
            }

            let message = serde_json::from_str(text).map_err(CodecError::Decode)?;
            return Ok(Some(message));
        }
    }

    /// Pushes a chunk and drains every complete message it finishes.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<Message>, CodecError> {
        self.push(chunk);
        let mut messages = Vec::new();
        while let Some(message) = self.next_message()? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PlayerData;

    fn player(uuid: &str, x: i32, y: i32) -> PlayerData {
        PlayerData {
            uuid: uuid.to_string(),
            nickname: format!("玩家{uuid}"),
            x,
            y,
            role_id: 2,
        }
    }

    fn sample_stream() -> (Vec<Message>, Vec<u8>) {
        let messages = vec![
            Message::login_ok(player("self", 5, 5)),
            Message::login_failed("账号或密码错误"),
            Message::SerPlayerList {
                player_list: vec![player("a", 1, 2), player("b", 3, 4)],
            },
            Message::SerPlayerList {
                player_list: vec![],
            },
            Message::SerMove {
                player_data: player("a", 9, 3),
            },
            Message::SerOffline {
                uuid: "b".to_string(),
            },
            Message::SerChat {
                nickname: "玩家a".to_string(),
                text: "pipe | inside".to_string(),
            },
            Message::CliLogin {
                username: "admin01".to_string(),
                password: "123456".to_string(),
            },
            Message::CliMove { x: 3, y: 4 },
            Message::CliChat {
                text: "你好，世界".to_string(),
            },
            Message::SerOnline {
                player_data: PlayerData {
                    uuid: "abc".to_string(),
                    nickname: "玩家昵称1".to_string(),
                    x: 5,
                    y: 5,
                    role_id: 0,
                },
            },
        ];
        let bytes = messages
            .iter()
            .flat_map(|m| FrameCodec::encode(m).unwrap())
            .collect();
        (messages, bytes)
    }

    #[test]
    fn test_encode_appends_delimiter() {
        let frame = FrameCodec::encode(&Message::CliMove { x: 1, y: 2 }).unwrap();
        assert_eq!(
            String::from_utf8(frame).unwrap(),
            r#"{"protocol":"cli_move","x":1,"y":2}|#|"#
        );
    }

    #[test]
    fn test_merged_frames_in_one_chunk() {
        let (messages, bytes) = sample_stream();
        let mut codec = FrameCodec::new();
        assert_eq!(codec.decode(&bytes).unwrap(), messages);
        assert_eq!(codec.pending(), 0);
    }

    #[test]
    fn test_split_at_every_boundary() {
        let (messages, bytes) = sample_stream();

        for split in 1..bytes.len() {
            let mut codec = FrameCodec::new();
            let mut decoded = codec.decode(&bytes[..split]).unwrap();
            decoded.extend(codec.decode(&bytes[split..]).unwrap());
            assert_eq!(decoded, messages, "split at byte {split}");
        }
    }

    #[test]
    fn test_byte_by_byte() {
        let (messages, bytes) = sample_stream();
        let mut codec = FrameCodec::new();
        let mut decoded = Vec::new();
        for byte in &bytes {
            decoded.extend(codec.decode(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(decoded, messages);
    }

    #[test]
    fn test_partial_frame_is_kept() {
        let mut codec = FrameCodec::new();
        let decoded = codec.decode(br#"{"protocol":"cli_move","x":1"#).unwrap();
        assert!(decoded.is_empty());
        assert!(codec.pending() > 0);

        let decoded = codec.decode(br#","y":2}|#|"#).unwrap();
        assert_eq!(decoded, vec![Message::CliMove { x: 1, y: 2 }]);
    }

    #[test]
    fn test_delimiter_inside_text_is_escaped() {
        let message = Message::CliChat {
            text: "a|#|b||#".to_string(),
        };
        let frame = FrameCodec::encode(&message).unwrap();
        assert_eq!(find_delimiter(&frame), Some(frame.len() - DELIMITER.len()));

        let mut codec = FrameCodec::new();
        assert_eq!(codec.decode(&frame).unwrap(), vec![message]);
    }

    #[test]
    fn test_empty_frames_are_skipped() {
        let mut codec = FrameCodec::new();
        let decoded = codec
            .decode(br#"|#|{"protocol":"cli_move","x":1,"y":2}|#|  |#|"#)
            .unwrap();
        assert_eq!(decoded, vec![Message::CliMove { x: 1, y: 2 }]);
    }

    #[test]
    fn test_invalid_json() {
        let mut codec = FrameCodec::new();
        assert!(matches!(
            codec.decode(b"{not json}|#|"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_missing_protocol_tag() {
        let mut codec = FrameCodec::new();
        assert!(matches!(
            codec.decode(br#"{"x":1,"y":2}|#|"#),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_unknown_tag_decodes() {
        let mut codec = FrameCodec::new();
        assert_eq!(
            codec.decode(br#"{"protocol":"cli_wave"}|#|"#).unwrap(),
            vec![Message::Unknown]
        );
    }

    #[test]
    fn test_frames_before_a_bad_one_are_delivered() {
        let mut codec = FrameCodec::new();
        codec.push(br#"{"protocol":"cli_move","x":1,"y":2}|#|garbage|#|"#);
        assert_eq!(
            codec.next_message().unwrap(),
            Some(Message::CliMove { x: 1, y: 2 })
        );
        assert!(codec.next_message().is_err());
    }

    #[test]
    fn test_oversized_frame() {
        let mut codec = FrameCodec::new();
        let junk = vec![b'a'; MAX_FRAME_LEN + 1];
        assert!(matches!(
            codec.decode(&junk),
            Err(CodecError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut codec = FrameCodec::new();
        assert!(matches!(
            codec.decode(b"\xff\xfe|#|"),
            Err(CodecError::Utf8(_))
        ));
    }
}
