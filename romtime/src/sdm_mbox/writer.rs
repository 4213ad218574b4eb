// Licensed under the Apache-2.0 license

use super::ring::{CmdIn, CmdOut};
use super::{Request, SdmMailbox, SdmMailboxHw};
use crate::{SdmMboxError, SdmMboxResult};
use core::fmt::Write;
use sdm_mbox_common::{HeaderCodec, RequestHeader};

/// Doorbell bookkeeping threaded through every word of one message.
#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct OverflowState {
    /// A doorbell went out since the last word landed in the ring.
    doorbell_rung: bool,
    /// The ring filled up at least once during this message.
    overflowed: bool,
}

impl<H: SdmMailboxHw, C: HeaderCodec> SdmMailbox<H, C> {
    /// Appends one word to the command ring, waiting for the far end to
    /// free a slot if the ring is full.
    pub(crate) fn enqueue(
        &mut self,
        cin: &mut CmdIn,
        word: u32,
        overflow: &mut OverflowState,
    ) -> SdmMboxResult<()> {
        let mut polls = 0;
        while cin.is_full(CmdOut::observe(&self.hw)) {
            // Wake the far end once per full episode, not per blocked sample.
            if !overflow.doorbell_rung {
                self.ring_doorbell();
                overflow.doorbell_rung = true;
                overflow.overflowed = true;
            }
            if polls == self.config.cmd_space_polls {
                crate::println!("[sdm-mbox] Command ring stuck full at {}", cin.get());
                return Err(SdmMboxError::Timeout);
            }
            polls += 1;
            self.hw.delay_us(self.config.poll_interval_us);
        }
        cin.push(&mut self.hw, word);
        overflow.doorbell_rung = false;
        Ok(())
    }

    /// Writes a header and its arguments to the command ring and tells the
    /// far end about them.
    pub fn enqueue_message(&mut self, header: &RequestHeader, args: &[u32]) -> SdmMboxResult<()> {
        // A truncated client or id would never match its own response.
        if args.len() != header.len as usize || !C::fits(header) {
            return Err(SdmMboxError::InvalidCommand);
        }

        let mut cin = CmdIn::load(&self.hw);
        let mut overflow = OverflowState::default();
        self.enqueue(&mut cin, C::encode_request(header), &mut overflow)?;
        for &arg in args {
            self.enqueue(&mut cin, arg, &mut overflow)?;
        }

        // Announce the tail of the message.
        self.ring_doorbell();
        if !overflow.overflowed {
            return Ok(());
        }

        let drained = self.poll_until(self.config.cmd_drain_polls, |hw| {
            cin.is_drained(CmdOut::observe(hw))
        });
        if drained.is_none() {
            crate::println!(
                "[sdm-mbox] Command ring not drained, CIN {} COUT {}",
                cin.get(),
                CmdOut::observe(&self.hw).get()
            );
            return Err(SdmMboxError::Timeout);
        }
        Ok(())
    }

    /// Sends a request without waiting for its response. Whatever the far
    /// end answers is collected later with `harvest_available`.
    pub fn post(&mut self, request: &Request) -> SdmMboxResult<()> {
        self.enqueue_message(&request.header(), request.args)
    }
}
