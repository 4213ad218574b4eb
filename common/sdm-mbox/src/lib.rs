// Licensed under the Apache-2.0 license

//! Wire-level vocabulary of the Secure Device Manager (SDM) mailbox, shared by
//! the bootloader and the emulated far end.

#![cfg_attr(target_os = "none", no_std)]

pub mod codec;
pub mod config_status;
pub mod messages;

pub use codec::{HeaderCodec, RequestHeader, ResponseHeader, SdmHeaderV1, SdmHeaderWord};
pub use config_status::{ConfigError, ConfigStatus, ReconfigStatusResp};
pub use messages::{CommandId, RespCode};
