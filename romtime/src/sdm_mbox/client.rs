// Licensed under the Apache-2.0 license

//! Channel bring-up and the named calls the boot flow makes.

use super::regs::{all_interrupts, SdmMailboxHw, WriteReg};
use super::SdmMailbox;
use crate::{fatal_error, HexWord, SdmMboxError, SdmMboxResult};
use boot_error::BootError;
use core::fmt::Write;
use sdm_mbox_common::config_status::{config_state_name, RECONFIG_STATUS_RESP_LEN};
use sdm_mbox_common::messages::{HpsExecutionState, IDCODE_RESP_LEN};
use sdm_mbox_common::{
    CommandId, ConfigError, ConfigStatus, HeaderCodec, ReconfigStatusResp, RespCode,
};

impl<H: SdmMailboxHw, C: HeaderCodec> SdmMailbox<H, C> {
    fn enable_interrupts(&mut self) {
        self.hw.write_reg(WriteReg::Flags, all_interrupts());
    }

    /// Brings the channel up: arms interrupts, clears the urgent register
    /// and the inbound doorbell, then restarts the far end's mailbox.
    pub fn init(&mut self) -> SdmMboxResult<()> {
        self.enable_interrupts();
        self.hw.write_reg(WriteReg::Urgent, 0);
        self.clear_doorbell();

        let request = self.request(CommandId::RESTART, &[]);
        self.call_with_retry(&request, &mut [])?;

        // RESTART clears the interrupt enables on the far end.
        self.enable_interrupts();
        Ok(())
    }

    /// Same as `init`, but a failure ends the boot.
    pub fn init_or_halt(&mut self) {
        if let Err(err) = self.init() {
            crate::println!("[sdm-mbox] Mailbox init failed: {:?}", err);
            fatal_error(BootError::SDM_MBOX_INIT);
        }
    }

    /// Asks the far end for a cold reset of the SoC. Tried exactly once.
    pub fn cold_reset(&mut self) -> SdmMboxResult<()> {
        let request = self.request(CommandId::REBOOT_HPS, &[]);
        self.call(&request, &mut [])?.into_result().map(|_| ())
    }

    /// Cold reset that never returns: the far end resets the SoC, or the
    /// fatal handler leaves it to the watchdog.
    #[allow(clippy::empty_loop)]
    pub fn reset_cold_or_halt(&mut self) -> ! {
        match self.cold_reset() {
            Ok(()) => loop {},
            Err(err) => {
                crate::println!("[sdm-mbox] Cold reset refused: {:?}", err);
                fatal_error(BootError::SDM_MBOX_COLD_RESET)
            }
        }
    }

    /// Queries the fabric configuration state with `CONFIG_STATUS` or
    /// `RECONFIG_STATUS`.
    pub fn fpga_config_status(&mut self, command: CommandId) -> SdmMboxResult<ConfigStatus> {
        let mut words = [0u32; RECONFIG_STATUS_RESP_LEN];
        let request = self.request(command, &[]);
        let len = self.call_with_retry(&request, &mut words)?;
        let resp = ReconfigStatusResp::from_words(&words[..len]);
        let status = resp.evaluate();
        if let ConfigStatus::Failed(state) = status {
            crate::println!(
                "[sdm-mbox] FPGA config failed, state {} ({}) location {} details {}: {}",
                HexWord(state),
                config_state_name(state),
                HexWord(resp.error_location),
                HexWord(resp.error_details),
                ConfigError::from_word(resp.error_details)
            );
        }
        Ok(status)
    }

    /// Polls `RECONFIG_STATUS` until the fabric leaves the configuring state.
    pub fn wait_fpga_configured(&mut self) -> SdmMboxResult<ConfigStatus> {
        let interval_us = self.config.config_status_interval_us;
        let limit_us = self.config.config_status_timeout_ms as u64 * 1000;
        let mut waited_us = 0u64;
        loop {
            match self.fpga_config_status(CommandId::RECONFIG_STATUS)? {
                ConfigStatus::Configuring => {}
                status => return Ok(status),
            }
            if waited_us >= limit_us {
                crate::println!("[sdm-mbox] FPGA still configuring after {} ms", waited_us / 1000);
                return Err(SdmMboxError::Timeout);
            }
            self.hw.delay_us(interval_us);
            waited_us += interval_us as u64;
        }
    }

    /// Waits for the fabric and ends the boot unless it came up configured.
    pub fn wait_fpga_configured_or_halt(&mut self) {
        let code = match self.wait_fpga_configured() {
            Ok(ConfigStatus::Configured) => return,
            Ok(ConfigStatus::HardwareError) => {
                crate::println!("[sdm-mbox] FPGA fabric reports a hardware fault");
                BootError::FPGA_CONFIG_HW_ERROR
            }
            Ok(ConfigStatus::Failed(state)) => {
                crate::println!(
                    "[sdm-mbox] FPGA config ended in state {}: {}",
                    HexWord(state),
                    config_state_name(state)
                );
                BootError::FPGA_CONFIG_FAILED
            }
            Ok(ConfigStatus::Configuring) | Err(SdmMboxError::Timeout) => {
                BootError::FPGA_CONFIG_TIMEOUT
            }
            Err(err) => {
                crate::println!("[sdm-mbox] No config status from SDM: {:?}", err);
                BootError::SDM_MBOX_UNRESPONSIVE
            }
        };
        fatal_error(code);
    }

    /// Takes the QSPI controller from the far end and switches it to direct
    /// access.
    pub fn qspi_open(&mut self) -> SdmMboxResult<()> {
        let open = self.request(CommandId::QSPI_OPEN, &[]);
        self.call_with_retry(&open, &mut [])?;
        let direct = self.request(CommandId::QSPI_DIRECT, &[]);
        self.call_with_retry(&direct, &mut [])?;
        Ok(())
    }

    pub fn qspi_close(&mut self) -> SdmMboxResult<()> {
        let request = self.request(CommandId::QSPI_CLOSE, &[]);
        self.call_with_retry(&request, &mut []).map(|_| ())
    }

    pub fn hps_stage_notify(&mut self, stage: HpsExecutionState) -> SdmMboxResult<()> {
        let args = [u32::from(stage)];
        let request = self.request(CommandId::HPS_STAGE_NOTIFY, &args);
        self.call_with_retry(&request, &mut []).map(|_| ())
    }

    /// Reads the remote system update status words into `out`.
    pub fn rsu_status(&mut self, out: &mut [u32]) -> SdmMboxResult<usize> {
        let request = self.request(CommandId::RSU_STATUS, &[]);
        self.call_with_retry(&request, out)
    }

    pub fn get_idcode(&mut self) -> SdmMboxResult<u32> {
        let mut idcode = [0u32; IDCODE_RESP_LEN];
        let request = self.request(CommandId::GET_IDCODE, &[]);
        match self.call_with_retry(&request, &mut idcode)? {
            IDCODE_RESP_LEN => Ok(idcode[0]),
            _ => Err(SdmMboxError::CmdFailed(
                RespCode::NO_VALID_RESP_AVAILABLE.0,
            )),
        }
    }
}
