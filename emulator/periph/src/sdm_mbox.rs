// Licensed under the Apache-2.0 license

//! Behavioral model of the Secure Device Manager side of the mailbox.
//!
//! The model owns its own microsecond clock. Every delay the firmware asks
//! for advances that clock, and the far end runs once per service interval
//! while time passes: it acknowledges the inbound doorbell, consumes command
//! words, hands complete commands to a handler and publishes the handler's
//! responses into the response ring.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};
use romtime::sdm_mbox::{ReadReg, SdmMailboxHw, Status, WriteReg, CMD_BUF_WORDS, RESP_BUF_WORDS};
use sdm_mbox_common::{CommandId, RequestHeader, RespCode, ResponseHeader, SdmHeaderV1};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A command as the far end assembled it from the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedCommand {
    pub header: RequestHeader,
    pub args: Vec<u32>,
}

impl ReceivedCommand {
    pub fn command(&self) -> CommandId {
        self.header.command
    }
}

/// One response the far end will queue, header first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdmResponse {
    pub client: u32,
    pub id: u32,
    pub code: RespCode,
    pub data: Vec<u32>,
    /// Header length to advertise instead of `data.len()`.
    pub declared_len: Option<u32>,
}

impl SdmResponse {
    pub fn ok(to: &ReceivedCommand, data: Vec<u32>) -> Self {
        Self::with_code(to, RespCode::OK, data)
    }

    pub fn error(to: &ReceivedCommand, code: RespCode) -> Self {
        Self::with_code(to, code, Vec::new())
    }

    pub fn with_code(to: &ReceivedCommand, code: RespCode, data: Vec<u32>) -> Self {
        SdmResponse {
            client: to.header.client,
            id: to.header.id,
            code,
            data,
            declared_len: None,
        }
    }

    /// A response addressed to a call nobody is waiting for.
    pub fn unmatched(client: u32, id: u32, data: Vec<u32>) -> Self {
        SdmResponse {
            client,
            id,
            code: RespCode::OK,
            data,
            declared_len: None,
        }
    }

    /// Advertises `len` data words no matter how many follow the header.
    pub fn with_declared_len(self, len: u32) -> Self {
        SdmResponse {
            declared_len: Some(len),
            ..self
        }
    }

    pub fn words(&self) -> Vec<u32> {
        let header = SdmHeaderV1::encode_response(&ResponseHeader {
            client: self.client,
            id: self.id,
            len: self.declared_len.unwrap_or(self.data.len() as u32),
            error: self.code,
        });
        let mut words = vec![header];
        words.extend_from_slice(&self.data);
        words
    }
}

type Handler = Box<dyn FnMut(&ReceivedCommand) -> Vec<SdmResponse> + Send>;

/// Register values at one instant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SdmMboxSnapshot {
    pub cin: u32,
    pub cout: u32,
    pub rin: u32,
    pub rout: u32,
    pub urg: u32,
    pub flags: u32,
    pub status: u32,
    pub doorbell_to_sdm: u32,
    pub doorbell_from_sdm: u32,
}

const CMD_WORDS: usize = CMD_BUF_WORDS as usize;
const RESP_WORDS: usize = RESP_BUF_WORDS as usize;

struct SdmMboxInner {
    regs: SdmMboxSnapshot,
    cmd_buf: [u32; CMD_WORDS],
    resp_buf: [u32; RESP_WORDS],

    now_ns: u64,
    next_service_ns: u64,
    service_interval_ns: u64,
    consume_per_service: usize,
    consume_limit: Option<usize>,
    ack_urgent: bool,
    chatter: Option<Vec<u32>>,

    awake: bool,
    assembling: Option<ReceivedCommand>,
    outbox: VecDeque<u32>,
    handler: Handler,

    received: Vec<ReceivedCommand>,
    urgent_commands: Vec<u32>,
    doorbells_to_sdm: u32,
    resp_slot_reads: u32,
    ring_violations: u32,
}

impl SdmMboxInner {
    const DEFAULT_SERVICE_INTERVAL_NS: u64 = 1_000_000;

    fn new(handler: Handler) -> Self {
        SdmMboxInner {
            regs: SdmMboxSnapshot::default(),
            cmd_buf: [0; CMD_WORDS],
            resp_buf: [0; RESP_WORDS],
            now_ns: 0,
            next_service_ns: Self::DEFAULT_SERVICE_INTERVAL_NS,
            service_interval_ns: Self::DEFAULT_SERVICE_INTERVAL_NS,
            consume_per_service: usize::MAX,
            consume_limit: None,
            ack_urgent: true,
            chatter: None,
            awake: false,
            assembling: None,
            outbox: VecDeque::new(),
            handler,
            received: Vec::new(),
            urgent_commands: Vec::new(),
            doorbells_to_sdm: 0,
            resp_slot_reads: 0,
            ring_violations: 0,
        }
    }

    fn advance(&mut self, ns: u64) {
        self.now_ns += ns;
        while self.next_service_ns <= self.now_ns {
            self.service();
            self.next_service_ns += self.service_interval_ns;
        }
    }

    /// Number of command slots the far end has not consumed yet.
    fn cmd_occupied(&self) -> u32 {
        (self.regs.cin + CMD_BUF_WORDS - self.regs.cout) % CMD_BUF_WORDS
    }

    fn host_write(&mut self, reg: WriteReg, val: u32) {
        match reg {
            WriteReg::Cin => {
                let val = val % CMD_BUF_WORDS;
                if val == self.regs.cout && self.cmd_occupied() != 0 {
                    warn!(
                        "[sdm] CIN advanced onto COUT {} with words pending",
                        self.regs.cout
                    );
                    self.ring_violations += 1;
                }
                self.regs.cin = val;
            }
            WriteReg::Rout => self.regs.rout = val % RESP_BUF_WORDS,
            WriteReg::Urgent => self.regs.urg = val,
            WriteReg::Flags => self.regs.flags = val,
            WriteReg::DoorbellToSdm => {
                if val != 0 {
                    self.doorbells_to_sdm += 1;
                }
                self.regs.doorbell_to_sdm = val;
            }
            WriteReg::DoorbellFromSdm => self.regs.doorbell_from_sdm = val,
        }
    }

    fn host_write_cmd_slot(&mut self, index: u32, word: u32) {
        let offset = (index + CMD_BUF_WORDS - self.regs.cout) % CMD_BUF_WORDS;
        if offset < self.cmd_occupied() {
            warn!("[sdm] Command slot {} overwritten before it was consumed", index);
            self.ring_violations += 1;
        }
        self.cmd_buf[index as usize % CMD_WORDS] = word;
    }

    fn service(&mut self) {
        if self.regs.doorbell_to_sdm != 0 {
            self.regs.doorbell_to_sdm = 0;
            self.awake = true;
            if self.regs.urg != 0 {
                self.take_urgent();
            }
        }

        if self.awake {
            let mut budget = self.consume_per_service;
            if let Some(limit) = self.consume_limit {
                budget = budget.min(limit);
            }
            let mut consumed = 0;
            while consumed < budget && self.regs.cout != self.regs.cin {
                let word = self.cmd_buf[self.regs.cout as usize];
                self.regs.cout = (self.regs.cout + 1) % CMD_BUF_WORDS;
                consumed += 1;
                self.assemble(word);
            }
            if let Some(limit) = self.consume_limit.as_mut() {
                *limit -= consumed;
            }
            // Nothing left, go back to waiting for the doorbell.
            if self.regs.cout == self.regs.cin {
                self.awake = false;
            }
        }

        if let Some(chatter) = &self.chatter {
            self.outbox.extend(chatter.iter().copied());
        }
        self.publish_responses();
    }

    fn take_urgent(&mut self) {
        let command = self.regs.urg;
        self.regs.urg = 0;
        self.urgent_commands.push(command);
        if self.ack_urgent {
            debug!("[sdm] Urgent command {:#x} acknowledged", command);
            self.regs.status ^= Status::Ua::SET.value;
        } else {
            warn!("[sdm] Urgent command {:#x} ignored", command);
        }
        self.regs.doorbell_from_sdm = 1;
    }

    fn assemble(&mut self, word: u32) {
        let command = match self.assembling.take() {
            Some(mut partial) => {
                partial.args.push(word);
                partial
            }
            None => ReceivedCommand {
                header: SdmHeaderV1::decode_request(word),
                args: Vec::new(),
            },
        };
        if command.args.len() < command.header.len as usize {
            self.assembling = Some(command);
        } else {
            self.dispatch(command);
        }
    }

    fn dispatch(&mut self, command: ReceivedCommand) {
        debug!(
            "[sdm] Command {:#x} from client {} id {} with {} args",
            command.header.command.0,
            command.header.client,
            command.header.id,
            command.args.len()
        );
        if command.command() == CommandId::RESTART {
            self.regs.flags = 0;
        }
        for response in (self.handler)(&command) {
            self.outbox.extend(response.words());
        }
        self.received.push(command);
    }

    fn publish_responses(&mut self) {
        let mut pushed = 0;
        while let Some(&word) = self.outbox.front() {
            if (self.regs.rin + 1) % RESP_BUF_WORDS == self.regs.rout {
                break;
            }
            self.resp_buf[self.regs.rin as usize] = word;
            self.regs.rin = (self.regs.rin + 1) % RESP_BUF_WORDS;
            self.outbox.pop_front();
            pushed += 1;
        }
        if pushed > 0 {
            self.regs.doorbell_from_sdm = 1;
        }
    }
}

/// Shared handle to the emulated far end. Clones see the same mailbox, so a
/// test can keep one while the firmware owns another.
#[derive(Clone)]
pub struct SdmMboxPeriph {
    inner: Arc<Mutex<SdmMboxInner>>,
}

impl Default for SdmMboxPeriph {
    /// Answers every command with a bare success.
    fn default() -> Self {
        Self::new(|command| vec![SdmResponse::ok(command, Vec::new())])
    }
}

impl SdmMboxPeriph {
    pub fn new(
        handler: impl FnMut(&ReceivedCommand) -> Vec<SdmResponse> + Send + 'static,
    ) -> Self {
        SdmMboxPeriph {
            inner: Arc::new(Mutex::new(SdmMboxInner::new(Box::new(handler)))),
        }
    }

    /// How often the far end wakes up to look at the mailbox.
    pub fn set_service_interval_us(&self, us: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.service_interval_ns = us.max(1) as u64 * 1000;
        inner.next_service_ns = inner.now_ns + inner.service_interval_ns;
    }

    /// Caps the command words consumed per service, to provoke overflow.
    pub fn set_consume_per_service(&self, words: usize) {
        self.inner.lock().unwrap().consume_per_service = words;
    }

    /// Stops consuming command words for good after `words` more, as a far
    /// end that hangs mid-message would. `None` lifts the limit.
    pub fn set_consume_limit(&self, words: Option<usize>) {
        self.inner.lock().unwrap().consume_limit = words;
    }

    pub fn set_ack_urgent(&self, ack: bool) {
        self.inner.lock().unwrap().ack_urgent = ack;
    }

    /// Queues `response` again on every service.
    pub fn set_chatter(&self, response: Option<SdmResponse>) {
        self.inner.lock().unwrap().chatter = response.map(|r| r.words());
    }

    /// Queues a response nobody asked for, as left behind by an abandoned call.
    pub fn inject_response(&self, response: SdmResponse) {
        self.inner.lock().unwrap().outbox.extend(response.words());
    }

    /// Starts both rings empty at the given positions.
    pub fn set_ring_positions(&self, cmd: u32, resp: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.regs.cin = cmd % CMD_BUF_WORDS;
        inner.regs.cout = cmd % CMD_BUF_WORDS;
        inner.regs.rin = resp % RESP_BUF_WORDS;
        inner.regs.rout = resp % RESP_BUF_WORDS;
    }

    pub fn advance_us(&self, us: u32) {
        self.inner.lock().unwrap().advance(us as u64 * 1000);
    }

    pub fn now_us(&self) -> u64 {
        self.inner.lock().unwrap().now_ns / 1000
    }

    pub fn snapshot(&self) -> SdmMboxSnapshot {
        self.inner.lock().unwrap().regs
    }

    pub fn received(&self) -> Vec<ReceivedCommand> {
        self.inner.lock().unwrap().received.clone()
    }

    pub fn urgent_commands(&self) -> Vec<u32> {
        self.inner.lock().unwrap().urgent_commands.clone()
    }

    pub fn doorbells_to_sdm(&self) -> u32 {
        self.inner.lock().unwrap().doorbells_to_sdm
    }

    pub fn resp_slot_reads(&self) -> u32 {
        self.inner.lock().unwrap().resp_slot_reads
    }

    /// Times the host overwrote an unconsumed slot or made a full ring
    /// look empty.
    pub fn ring_violations(&self) -> u32 {
        self.inner.lock().unwrap().ring_violations
    }
}

impl DelayNs for SdmMboxPeriph {
    fn delay_ns(&mut self, ns: u32) {
        self.inner.lock().unwrap().advance(ns as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.inner.lock().unwrap().advance(us as u64 * 1000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.inner.lock().unwrap().advance(ms as u64 * 1_000_000);
    }
}

impl SdmMailboxHw for SdmMboxPeriph {
    const CMD_BUF_WORDS: u32 = CMD_BUF_WORDS;
    const RESP_BUF_WORDS: u32 = RESP_BUF_WORDS;

    fn read_reg(&self, reg: ReadReg) -> u32 {
        let regs = self.inner.lock().unwrap().regs;
        match reg {
            ReadReg::Cin => regs.cin,
            ReadReg::Rout => regs.rout,
            ReadReg::Flags => regs.flags,
            ReadReg::Cout => regs.cout,
            ReadReg::Rin => regs.rin,
            ReadReg::Status => regs.status,
            ReadReg::DoorbellToSdm => regs.doorbell_to_sdm,
            ReadReg::DoorbellFromSdm => regs.doorbell_from_sdm,
        }
    }

    fn write_reg(&mut self, reg: WriteReg, val: u32) {
        self.inner.lock().unwrap().host_write(reg, val);
    }

    fn write_cmd_slot(&mut self, index: u32, word: u32) {
        self.inner.lock().unwrap().host_write_cmd_slot(index, word);
    }

    fn read_resp_slot(&self, index: u32) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        inner.resp_slot_reads += 1;
        inner.resp_buf[index as usize % RESP_WORDS]
    }
}
