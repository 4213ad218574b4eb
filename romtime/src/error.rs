// Licensed under the Apache-2.0 license

use sdm_mbox_common::RespCode;

/// Failure of a mailbox exchange with the Secure Device Manager.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SdmMboxError {
    /// No doorbell within the wait bound, or the command ring did not drain
    /// after an overflow.
    Timeout,
    /// Command code outside the range the header can carry.
    InvalidCommand,
    /// The far end answered `DEVICE_BUSY`.
    DeviceBusy,
    /// The urgent acknowledge bit did not toggle.
    CommError,
    /// Any other response code, passed through verbatim.
    CmdFailed(u32),
}

impl SdmMboxError {
    /// Outcomes worth re-issuing the same call for.
    pub fn is_transient(&self) -> bool {
        matches!(self, SdmMboxError::Timeout | SdmMboxError::DeviceBusy)
    }
}

impl From<RespCode> for SdmMboxError {
    fn from(code: RespCode) -> Self {
        if code.is_busy() {
            SdmMboxError::DeviceBusy
        } else {
            SdmMboxError::CmdFailed(code.0)
        }
    }
}

impl From<SdmMboxError> for u32 {
    fn from(err: SdmMboxError) -> Self {
        match err {
            SdmMboxError::Timeout => 0xf001_0001,
            SdmMboxError::InvalidCommand => 0xf001_0002,
            SdmMboxError::DeviceBusy => RespCode::DEVICE_BUSY.0,
            SdmMboxError::CommError => 0xf001_0003,
            SdmMboxError::CmdFailed(code) => code,
        }
    }
}

pub type SdmMboxResult<T> = Result<T, SdmMboxError>;
