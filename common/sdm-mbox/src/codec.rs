// Licensed under the Apache-2.0 license

use crate::messages::{CommandId, RespCode};
use bitfield::bitfield;

bitfield! {
    /// Header word layout used by SDM firmware for both directions. In a
    /// response the command field carries the error code.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct SdmHeaderWord(u32);
    impl Debug;
    u32;
    pub command, set_command: 10, 0;
    pub indirect, set_indirect: 11;
    pub len, set_len: 22, 12;
    pub id, set_id: 27, 24;
    pub client, set_client: 31, 28;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub client: u32,
    pub id: u32,
    /// Number of argument words following the header.
    pub len: u32,
    pub indirect: bool,
    pub command: CommandId,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub client: u32,
    pub id: u32,
    /// Number of result words following the header.
    pub len: u32,
    pub error: RespCode,
}

/// Encoding of request headers and decoding of response headers.
///
/// The bit positions belong to the far-end firmware, so the mailbox engine
/// only ever goes through this trait and never does header bit math itself.
pub trait HeaderCodec {
    /// Highest command code the far end accepts.
    const MAX_COMMAND: u32;
    /// Highest argument count a single header can describe.
    const MAX_LEN: u32;
    /// Highest client identifier the header carries without truncation.
    const MAX_CLIENT: u32;
    /// Highest request identifier the header carries without truncation.
    const MAX_ID: u32;

    /// The header can carry every field of `header` unchanged.
    fn fits(header: &RequestHeader) -> bool {
        header.command.0 <= Self::MAX_COMMAND
            && header.len <= Self::MAX_LEN
            && header.client <= Self::MAX_CLIENT
            && header.id <= Self::MAX_ID
    }

    fn encode_request(header: &RequestHeader) -> u32;

    fn response_client(word: u32) -> u32;
    fn response_id(word: u32) -> u32;
    fn response_len(word: u32) -> u32;
    fn response_error(word: u32) -> u32;

    fn decode_response(word: u32) -> ResponseHeader {
        ResponseHeader {
            client: Self::response_client(word),
            id: Self::response_id(word),
            len: Self::response_len(word),
            error: RespCode(Self::response_error(word)),
        }
    }
}

/// First-generation SDM header layout: command/error `[10:0]`, indirect
/// `[11]`, length `[22:12]`, id `[27:24]`, client `[31:28]`.
pub enum SdmHeaderV1 {}

impl HeaderCodec for SdmHeaderV1 {
    const MAX_COMMAND: u32 = 0x7ff;
    const MAX_LEN: u32 = 0x7ff;
    const MAX_CLIENT: u32 = 0xf;
    const MAX_ID: u32 = 0xf;

    fn encode_request(header: &RequestHeader) -> u32 {
        let mut word = SdmHeaderWord(0);
        word.set_client(header.client);
        word.set_id(header.id);
        word.set_len(header.len);
        word.set_indirect(header.indirect);
        word.set_command(header.command.0);
        word.0
    }

    fn response_client(word: u32) -> u32 {
        SdmHeaderWord(word).client()
    }

    fn response_id(word: u32) -> u32 {
        SdmHeaderWord(word).id()
    }

    fn response_len(word: u32) -> u32 {
        SdmHeaderWord(word).len()
    }

    fn response_error(word: u32) -> u32 {
        SdmHeaderWord(word).command()
    }
}

// The far end's half of the format: it reads requests and writes responses.
impl SdmHeaderV1 {
    pub fn decode_request(word: u32) -> RequestHeader {
        let word = SdmHeaderWord(word);
        RequestHeader {
            client: word.client(),
            id: word.id(),
            len: word.len(),
            indirect: word.indirect(),
            command: CommandId(word.command()),
        }
    }

    pub fn encode_response(header: &ResponseHeader) -> u32 {
        let mut word = SdmHeaderWord(0);
        word.set_client(header.client);
        word.set_id(header.id);
        word.set_len(header.len);
        word.set_command(header.error.0);
        word.0
    }
}
