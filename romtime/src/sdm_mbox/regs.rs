// Licensed under the Apache-2.0 license

//! Register access layer of the SDM mailbox.

use crate::static_ref::StaticRef;
use core::sync::atomic::{fence, Ordering};
use embedded_hal::delay::DelayNs;
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::{register_bitfields, register_structs};

pub const CMD_BUF_WORDS: u32 = 32;
pub const RESP_BUF_WORDS: u32 = 16;

register_bitfields! {
    u32,
        pub Flags [
            /// Command ring consumed interrupt enable
            Coe OFFSET(0) NUMBITS(1) [],
            /// Response ring written interrupt enable
            Rie OFFSET(1) NUMBITS(1) [],
            /// Urgent acknowledge interrupt enable
            Uae OFFSET(8) NUMBITS(1) [],
        ],
        pub Status [
            /// Toggled by the far end each time it takes an urgent command
            Ua OFFSET(8) NUMBITS(1) [],
        ],
}

register_structs! {
    pub SdmMboxRegisters {
        (0x0 => pub cin: tock_registers::registers::ReadWrite<u32>),
        (0x4 => pub rout: tock_registers::registers::ReadWrite<u32>),
        (0x8 => pub urg: tock_registers::registers::ReadWrite<u32>),
        (0xc => pub flags: tock_registers::registers::ReadWrite<u32, Flags::Register>),
        (0x10 => _reserved0),
        (0x20 => pub cout: tock_registers::registers::ReadOnly<u32>),
        (0x24 => pub rin: tock_registers::registers::ReadOnly<u32>),
        (0x28 => _reserved1),
        (0x2c => pub status: tock_registers::registers::ReadOnly<u32, Status::Register>),
        (0x30 => _reserved2),
        (0x40 => pub cmd_buf: [tock_registers::registers::ReadWrite<u32>; 32]),
        (0xc0 => pub resp_buf: [tock_registers::registers::ReadOnly<u32>; 16]),
        (0x100 => _reserved3),
        (0x400 => pub doorbell_to_sdm: tock_registers::registers::ReadWrite<u32>),
        (0x404 => _reserved4),
        (0x480 => pub doorbell_from_sdm: tock_registers::registers::ReadWrite<u32>),
        (0x484 => @END),
    }
}

/// Every interrupt source the mailbox offers.
pub fn all_interrupts() -> u32 {
    (Flags::Coe::SET + Flags::Rie::SET + Flags::Uae::SET).value
}

pub fn urgent_ack(status: u32) -> bool {
    Status::Ua.is_set(status)
}

/// Registers the host may read. `URG` is write-only.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadReg {
    Cin,
    Rout,
    Flags,
    Cout,
    Rin,
    Status,
    DoorbellToSdm,
    DoorbellFromSdm,
}

/// Registers the host may write. `COUT`, `RIN` and `STATUS` belong to the
/// far end and have no variant here.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteReg {
    Cin,
    Rout,
    Urgent,
    Flags,
    DoorbellToSdm,
    DoorbellFromSdm,
}

/// Access to the mailbox register block plus the platform delay used
/// between polls.
///
/// Ring slot indices are raw ring positions; reducing them modulo the ring
/// capacity is the caller's job.
pub trait SdmMailboxHw: DelayNs {
    const CMD_BUF_WORDS: u32;
    const RESP_BUF_WORDS: u32;

    fn read_reg(&self, reg: ReadReg) -> u32;
    fn write_reg(&mut self, reg: WriteReg, val: u32);
    fn write_cmd_slot(&mut self, index: u32, word: u32);
    fn read_resp_slot(&self, index: u32) -> u32;
}

/// The mailbox as seen through its memory mapped registers.
pub struct MmioSdmMailbox<D: DelayNs> {
    registers: StaticRef<SdmMboxRegisters>,
    delay: D,
}

impl<D: DelayNs> MmioSdmMailbox<D> {
    pub const fn new(registers: StaticRef<SdmMboxRegisters>, delay: D) -> Self {
        MmioSdmMailbox { registers, delay }
    }
}

impl<D: DelayNs> DelayNs for MmioSdmMailbox<D> {
    fn delay_ns(&mut self, ns: u32) {
        self.delay.delay_ns(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

impl<D: DelayNs> SdmMailboxHw for MmioSdmMailbox<D> {
    const CMD_BUF_WORDS: u32 = CMD_BUF_WORDS;
    const RESP_BUF_WORDS: u32 = RESP_BUF_WORDS;

    fn read_reg(&self, reg: ReadReg) -> u32 {
        match reg {
            ReadReg::Cin => self.registers.cin.get(),
            ReadReg::Rout => self.registers.rout.get(),
            ReadReg::Flags => self.registers.flags.get(),
            ReadReg::Cout => self.registers.cout.get(),
            ReadReg::Rin => self.registers.rin.get(),
            ReadReg::Status => self.registers.status.get(),
            ReadReg::DoorbellToSdm => self.registers.doorbell_to_sdm.get(),
            ReadReg::DoorbellFromSdm => self.registers.doorbell_from_sdm.get(),
        }
    }

    fn write_reg(&mut self, reg: WriteReg, val: u32) {
        match reg {
            // Slot accesses must land before the index that exposes them.
            WriteReg::Cin => {
                fence(Ordering::SeqCst);
                self.registers.cin.set(val);
            }
            WriteReg::Rout => {
                fence(Ordering::SeqCst);
                self.registers.rout.set(val);
            }
            WriteReg::Urgent => self.registers.urg.set(val),
            WriteReg::Flags => self.registers.flags.set(val),
            WriteReg::DoorbellToSdm => {
                fence(Ordering::SeqCst);
                self.registers.doorbell_to_sdm.set(val);
            }
            WriteReg::DoorbellFromSdm => self.registers.doorbell_from_sdm.set(val),
        }
    }

    fn write_cmd_slot(&mut self, index: u32, word: u32) {
        if let Some(slot) = self.registers.cmd_buf.get(index as usize) {
            slot.set(word);
        }
    }

    fn read_resp_slot(&self, index: u32) -> u32 {
        self.registers
            .resp_buf
            .get(index as usize)
            .map(|slot| slot.get())
            .unwrap_or(0)
    }
}
