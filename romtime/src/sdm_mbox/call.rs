// Licensed under the Apache-2.0 license

use super::regs::{urgent_ack, ReadReg, SdmMailboxHw, WriteReg};
use super::ring::{RespIn, RespOut};
use super::{Request, SdmMailbox};
use crate::{HexWord, SdmMboxError, SdmMboxResult};
use core::fmt::Write;
use sdm_mbox_common::{CommandId, HeaderCodec, RespCode, ResponseHeader};

/// Result of a call that got a matching response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    /// Error code from the response header.
    pub code: RespCode,
    /// Result words copied into the caller's buffer.
    pub len: usize,
}

impl CallOutcome {
    pub fn into_result(self) -> SdmMboxResult<usize> {
        if self.code.is_ok() {
            Ok(self.len)
        } else {
            Err(self.code.into())
        }
    }
}

/// Correlation key of the one request in flight.
#[derive(Debug, Copy, Clone)]
struct PendingCall {
    client: u32,
    id: u32,
}

impl PendingCall {
    fn matches(&self, header: &ResponseHeader) -> bool {
        header.client == self.client && header.id == self.id
    }
}

#[derive(Debug, Copy, Clone)]
enum CallState {
    AwaitingDoorbell,
    /// Doorbell seen, look at the response ring.
    CheckRing,
    /// Our header arrived, pull its result words.
    Draining(ResponseHeader),
}

impl<H: SdmMailboxHw, C: HeaderCodec> SdmMailbox<H, C> {
    /// Issues one request and waits for the response carrying the same
    /// client and id. Up to `resp.len()` result words are copied out; any
    /// further words are drained from the ring and dropped.
    pub fn call(&mut self, request: &Request, resp: &mut [u32]) -> SdmMboxResult<CallOutcome> {
        self.enqueue_message(&request.header(), request.args)?;
        let pending = PendingCall {
            client: request.client,
            id: request.id,
        };
        self.await_response(pending, resp)
    }

    fn await_response(
        &mut self,
        pending: PendingCall,
        resp: &mut [u32],
    ) -> SdmMboxResult<CallOutcome> {
        let mut rout = RespOut::load(&self.hw);
        let mut budget = self.config.call_deadline_polls;
        let mut state = CallState::AwaitingDoorbell;

        loop {
            state = match state {
                CallState::AwaitingDoorbell => {
                    let polls = match budget {
                        Some(0) => {
                            crate::println!("[sdm-mbox] Call deadline spent on stale responses");
                            return Err(SdmMboxError::Timeout);
                        }
                        Some(left) => left.min(self.config.doorbell_polls),
                        None => self.config.doorbell_polls,
                    };
                    let slept = self
                        .poll_until(polls, Self::doorbell_pending)
                        .ok_or(SdmMboxError::Timeout)?;
                    if let Some(left) = budget.as_mut() {
                        *left = left.saturating_sub(slept.max(1));
                    }
                    self.clear_doorbell();
                    CallState::CheckRing
                }
                CallState::CheckRing => {
                    if !rout.has_pending(RespIn::observe(&self.hw)) {
                        CallState::AwaitingDoorbell
                    } else {
                        let word = rout.pop(&mut self.hw);
                        let header = C::decode_response(word);
                        if pending.matches(&header) {
                            CallState::Draining(header)
                        } else {
                            crate::println!("[sdm-mbox] Dropping unmatched response {}", HexWord(word));
                            CallState::CheckRing
                        }
                    }
                }
                CallState::Draining(header) => {
                    let mut len = 0;
                    for _ in 0..header.len {
                        let word = self.wait_for_next_word(&mut rout)?;
                        if let Some(slot) = resp.get_mut(len) {
                            *slot = word;
                            len += 1;
                        }
                    }
                    return Ok(CallOutcome {
                        code: header.error,
                        len,
                    });
                }
            };
        }
    }

    /// Hands a single command word to the far end outside of the rings and
    /// waits for it to flip the urgent acknowledge bit.
    pub fn call_urgent(&mut self, command: CommandId) -> SdmMboxResult<()> {
        if command.0 > C::MAX_COMMAND {
            return Err(SdmMboxError::InvalidCommand);
        }

        let before = urgent_ack(self.hw.read_reg(ReadReg::Status));
        self.hw.write_reg(WriteReg::Urgent, command.0);
        self.ring_doorbell();

        self.poll_until(self.config.doorbell_polls, Self::doorbell_pending)
            .ok_or(SdmMboxError::Timeout)?;
        self.clear_doorbell();

        if urgent_ack(self.hw.read_reg(ReadReg::Status)) != before {
            Ok(())
        } else {
            crate::println!("[sdm-mbox] Urgent command {} not acknowledged", HexWord(command.0));
            Err(SdmMboxError::CommError)
        }
    }

    /// Runs `call` again after a short pause while the far end times out or
    /// reports busy. Returns the number of result words copied.
    pub fn call_with_retry(&mut self, request: &Request, resp: &mut [u32]) -> SdmMboxResult<usize> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .call(request, resp)
                .and_then(CallOutcome::into_result);
            match result {
                Err(err) if err.is_transient() && attempt < self.config.retry_attempts => {
                    crate::println!(
                        "[sdm-mbox] Command {} attempt {} failed: {:?}",
                        HexWord(request.command.0),
                        attempt,
                        err
                    );
                    self.hw.delay_us(self.config.retry_delay_us);
                }
                _ => return result,
            }
        }
    }
}
