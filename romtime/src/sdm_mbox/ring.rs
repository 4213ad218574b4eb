// Licensed under the Apache-2.0 license

//! Ring indices split by owner.
//!
//! The host owns `CIN` and `ROUT` and is the only side that moves them, so
//! those two types carry the mutators and publish the new value to the
//! register as part of every advance. `COUT` and `RIN` belong to the far
//! end and can only be sampled.

use super::regs::{ReadReg, SdmMailboxHw, WriteReg};

/// Host write position in the command ring.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CmdIn {
    pos: u32,
    cap: u32,
}

/// Far-end read position in the command ring.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CmdOut(u32);

/// Far-end write position in the response ring.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RespIn(u32);

/// Host read position in the response ring.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RespOut {
    pos: u32,
    cap: u32,
}

impl CmdIn {
    pub fn load<H: SdmMailboxHw>(hw: &H) -> Self {
        CmdIn {
            pos: hw.read_reg(ReadReg::Cin) % H::CMD_BUF_WORDS,
            cap: H::CMD_BUF_WORDS,
        }
    }

    pub fn get(&self) -> u32 {
        self.pos
    }

    fn next(&self) -> u32 {
        (self.pos + 1) % self.cap
    }

    /// One slot is always left free so that a full ring never looks empty.
    pub fn is_full(&self, cout: CmdOut) -> bool {
        self.next() == cout.0
    }

    /// The far end has taken everything up to this position.
    pub fn is_drained(&self, cout: CmdOut) -> bool {
        cout.0 == self.pos || (cout.0 + 1) % self.cap == self.pos
    }

    /// Stores `word` in the current slot and publishes the advanced index.
    /// The caller checks `is_full` first.
    pub fn push<H: SdmMailboxHw>(&mut self, hw: &mut H, word: u32) {
        hw.write_cmd_slot(self.pos, word);
        self.pos = self.next();
        hw.write_reg(WriteReg::Cin, self.pos);
    }
}

impl CmdOut {
    pub fn observe<H: SdmMailboxHw>(hw: &H) -> Self {
        CmdOut(hw.read_reg(ReadReg::Cout) % H::CMD_BUF_WORDS)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl RespIn {
    pub fn observe<H: SdmMailboxHw>(hw: &H) -> Self {
        RespIn(hw.read_reg(ReadReg::Rin) % H::RESP_BUF_WORDS)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl RespOut {
    pub fn load<H: SdmMailboxHw>(hw: &H) -> Self {
        RespOut {
            pos: hw.read_reg(ReadReg::Rout) % H::RESP_BUF_WORDS,
            cap: H::RESP_BUF_WORDS,
        }
    }

    pub fn get(&self) -> u32 {
        self.pos
    }

    pub fn has_pending(&self, rin: RespIn) -> bool {
        self.pos != rin.0
    }

    /// Takes the word at the current slot and hands the slot back to the
    /// far end. The caller checks `has_pending` first.
    pub fn pop<H: SdmMailboxHw>(&mut self, hw: &mut H) -> u32 {
        let word = hw.read_resp_slot(self.pos);
        self.pos = (self.pos + 1) % self.cap;
        hw.write_reg(WriteReg::Rout, self.pos);
        word
    }
}
