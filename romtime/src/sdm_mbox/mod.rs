// Licensed under the Apache-2.0 license

//! Mailbox channel to the Secure Device Manager.
//!
//! Commands travel to the SDM through a 32 word ring and responses come
//! back through a 16 word ring, each paired with a doorbell register. A
//! single `SdmMailbox` owns the register block for the whole boot; every
//! call borrows it mutably, so at most one correlated request is ever in
//! flight.

mod call;
mod client;
mod reader;
mod regs;
mod ring;
mod writer;

pub use call::CallOutcome;
pub use regs::*;
pub use ring::{CmdIn, CmdOut, RespIn, RespOut};

use core::marker::PhantomData;
use sdm_config::SdmMailboxConfig;
use sdm_mbox_common::{CommandId, HeaderCodec, RequestHeader, SdmHeaderV1};

/// One request as handed to the call engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    pub client: u32,
    pub id: u32,
    pub command: CommandId,
    pub args: &'a [u32],
    /// Arguments point at data elsewhere instead of carrying it inline.
    pub indirect: bool,
}

impl Request<'_> {
    pub fn header(&self) -> RequestHeader {
        RequestHeader {
            client: self.client,
            id: self.id,
            len: self.args.len() as u32,
            indirect: self.indirect,
            command: self.command,
        }
    }
}

pub struct SdmMailbox<H: SdmMailboxHw, C: HeaderCodec = SdmHeaderV1> {
    hw: H,
    config: SdmMailboxConfig,
    codec: PhantomData<C>,
}

impl<H: SdmMailboxHw, C: HeaderCodec> SdmMailbox<H, C> {
    pub fn new(hw: H, config: SdmMailboxConfig) -> Self {
        SdmMailbox {
            hw,
            config,
            codec: PhantomData,
        }
    }

    pub fn config(&self) -> &SdmMailboxConfig {
        &self.config
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn into_inner(self) -> H {
        self.hw
    }

    /// Builds a request stamped with the configured client and request ids.
    pub fn request<'a>(&self, command: CommandId, args: &'a [u32]) -> Request<'a> {
        Request {
            client: self.config.client_id,
            id: self.config.request_id,
            command,
            args,
            indirect: false,
        }
    }

    fn ring_doorbell(&mut self) {
        self.hw.write_reg(WriteReg::DoorbellToSdm, 1);
    }

    fn doorbell_pending(hw: &H) -> bool {
        hw.read_reg(ReadReg::DoorbellFromSdm) != 0
    }

    fn clear_doorbell(&mut self) {
        self.hw.write_reg(WriteReg::DoorbellFromSdm, 0);
    }

    /// Samples `done` up to `polls + 1` times with one poll interval between
    /// samples. Returns the number of intervals slept before `done` held.
    fn poll_until(&mut self, polls: u32, done: impl Fn(&H) -> bool) -> Option<u32> {
        for slept in 0..polls {
            if done(&self.hw) {
                return Some(slept);
            }
            self.hw.delay_us(self.config.poll_interval_us);
        }
        done(&self.hw).then_some(polls)
    }
}
