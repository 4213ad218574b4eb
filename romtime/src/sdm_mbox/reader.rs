// Licensed under the Apache-2.0 license

use super::ring::{RespIn, RespOut};
use super::{SdmMailbox, SdmMailboxHw};
use crate::{SdmMboxError, SdmMboxResult};
use sdm_mbox_common::HeaderCodec;

impl<H: SdmMailboxHw, C: HeaderCodec> SdmMailbox<H, C> {
    /// Copies whatever the response ring holds, up to `out.len()` words,
    /// without waiting. Words that do not fit stay in the ring for the next
    /// harvest.
    pub fn harvest_available(&mut self, out: &mut [u32]) -> usize {
        if Self::doorbell_pending(&self.hw) {
            self.clear_doorbell();
        }

        let mut rout = RespOut::load(&self.hw);
        let mut count = 0;
        for slot in out.iter_mut() {
            if !rout.has_pending(RespIn::observe(&self.hw)) {
                break;
            }
            *slot = rout.pop(&mut self.hw);
            count += 1;
        }
        count
    }

    /// Blocks until the far end produces one more response word.
    pub(crate) fn wait_for_next_word(&mut self, rout: &mut RespOut) -> SdmMboxResult<u32> {
        let cursor = *rout;
        self.poll_until(self.config.resp_word_polls, |hw| {
            cursor.has_pending(RespIn::observe(hw))
        })
        .ok_or(SdmMboxError::Timeout)?;
        Ok(rout.pop(&mut self.hw))
    }
}
