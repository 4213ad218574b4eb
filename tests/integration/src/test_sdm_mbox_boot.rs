// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{channel, channel_with_config, panic_on_fatal_error};
    use emulator_periph::{ReceivedCommand, SdmMboxPeriph, SdmResponse};
    use romtime::sdm_mbox::all_interrupts;
    use romtime::SdmMboxError;
    use sdm_config::SdmMailboxConfig;
    use sdm_mbox_common::config_status::{CFGSTAT_STATE_CONFIG, CFGSTAT_STATE_ERROR_INVALID};
    use sdm_mbox_common::messages::{HpsExecutionState, RSU_STATUS_RESP_LEN};
    use sdm_mbox_common::{CommandId, ConfigStatus, RespCode};

    const NSTATUS: u32 = 1 << 31;
    const CONF_DONE_INIT_DONE: u32 = 0b11;

    fn status_words(state: u32, pin: u32, softfunc: u32) -> Vec<u32> {
        vec![state, 0x0000_0102, pin, softfunc, 0, 0]
    }

    fn commands(received: &[ReceivedCommand]) -> Vec<CommandId> {
        received.iter().map(ReceivedCommand::command).collect()
    }

    #[test]
    fn test_cold_boot_init() {
        let (mut mbox, periph) = channel(SdmMboxPeriph::default());

        mbox.init().unwrap();

        let received = periph.received();
        assert_eq!(commands(&received), vec![CommandId::RESTART]);
        assert_eq!(received[0].header.client, 1);
        assert_eq!(received[0].header.id, 1);
        assert_eq!(received[0].header.len, 0);

        // The restart cleared the enables; init armed them again.
        let regs = periph.snapshot();
        assert_eq!(regs.flags, all_interrupts());
        assert_eq!(regs.flags, 0x103);
        assert_eq!(regs.urg, 0);
        assert_eq!(regs.doorbell_to_sdm, 0);
        assert_eq!(regs.doorbell_from_sdm, 0);
        assert_eq!((regs.cin, regs.cout), (1, 1));
        assert_eq!((regs.rin, regs.rout), (1, 1));
    }

    #[test]
    fn test_init_retries_busy_restart() {
        let mut restarts = 0;
        let periph = SdmMboxPeriph::new(move |command| {
            restarts += 1;
            if restarts == 1 {
                vec![SdmResponse::error(command, RespCode::DEVICE_BUSY)]
            } else {
                vec![SdmResponse::ok(command, Vec::new())]
            }
        });
        let (mut mbox, periph) = channel(periph);

        mbox.init().unwrap();
        assert_eq!(periph.received().len(), 2);
    }

    #[test]
    fn test_init_fails_against_silent_far_end() {
        let (mut mbox, periph) = channel(SdmMboxPeriph::new(|_| Vec::new()));
        assert_eq!(mbox.init(), Err(SdmMboxError::Timeout));
        assert_eq!(periph.received().len(), 3);
    }

    #[test]
    #[should_panic(expected = "fatal error 0x10001")]
    fn test_init_or_halt_halts() {
        panic_on_fatal_error();
        let (mut mbox, _periph) = channel(SdmMboxPeriph::new(|command| {
            vec![SdmResponse::error(command, RespCode::ERROR)]
        }));
        mbox.init_or_halt();
    }

    #[test]
    fn test_cold_reset_is_not_retried() {
        let (mut mbox, periph) = channel(SdmMboxPeriph::new(|command| {
            vec![SdmResponse::error(command, RespCode::DEVICE_BUSY)]
        }));
        assert_eq!(mbox.cold_reset(), Err(SdmMboxError::DeviceBusy));
        assert_eq!(commands(&periph.received()), vec![CommandId::REBOOT_HPS]);

        let (mut mbox, _periph) = channel(SdmMboxPeriph::default());
        assert_eq!(mbox.cold_reset(), Ok(()));
    }

    #[test]
    #[should_panic(expected = "fatal error 0x10002")]
    fn test_refused_cold_reset_halts() {
        panic_on_fatal_error();
        let (mut mbox, _periph) = channel(SdmMboxPeriph::new(|command| {
            vec![SdmResponse::error(command, RespCode::ERROR)]
        }));
        mbox.reset_cold_or_halt();
    }

    #[test]
    fn test_fpga_config_status() {
        for (words, expected) in [
            (
                status_words(0, NSTATUS, CONF_DONE_INIT_DONE),
                ConfigStatus::Configured,
            ),
            (
                status_words(CFGSTAT_STATE_CONFIG, NSTATUS, 0),
                ConfigStatus::Configuring,
            ),
            (
                status_words(0, 0, CONF_DONE_INIT_DONE),
                ConfigStatus::HardwareError,
            ),
            (
                status_words(0x2000_0003, NSTATUS, 0),
                ConfigStatus::Failed(0x2000_0003),
            ),
        ] {
            let (mut mbox, periph) = channel(SdmMboxPeriph::new(move |command| {
                vec![SdmResponse::ok(command, words.clone())]
            }));
            assert_eq!(
                mbox.fpga_config_status(CommandId::CONFIG_STATUS),
                Ok(expected)
            );
            assert_eq!(commands(&periph.received()), vec![CommandId::CONFIG_STATUS]);
        }
    }

    #[test]
    fn test_wait_fpga_configured() {
        let mut queries = 0;
        let periph = SdmMboxPeriph::new(move |command| {
            queries += 1;
            let words = if queries < 3 {
                status_words(CFGSTAT_STATE_CONFIG, NSTATUS, 0)
            } else {
                status_words(0, NSTATUS, CONF_DONE_INIT_DONE)
            };
            vec![SdmResponse::ok(command, words)]
        });
        let (mut mbox, periph) = channel(periph);

        assert_eq!(mbox.wait_fpga_configured(), Ok(ConfigStatus::Configured));
        assert_eq!(
            commands(&periph.received()),
            vec![CommandId::RECONFIG_STATUS; 3]
        );
        assert!(periph.now_us() >= 2_000_000);
    }

    #[test]
    fn test_wait_fpga_configured_gives_up() {
        let periph = SdmMboxPeriph::new(|command| {
            vec![SdmResponse::ok(
                command,
                status_words(CFGSTAT_STATE_CONFIG, NSTATUS, 0),
            )]
        });
        let config = SdmMailboxConfig {
            config_status_timeout_ms: 3000,
            ..SdmMailboxConfig::default()
        };
        let (mut mbox, periph) = channel_with_config(periph, config);

        assert_eq!(mbox.wait_fpga_configured(), Err(SdmMboxError::Timeout));
        assert_eq!(periph.received().len(), 4);
    }

    #[test]
    fn test_configured_fabric_does_not_halt() {
        let (mut mbox, _periph) = channel(SdmMboxPeriph::new(|command| {
            vec![SdmResponse::ok(
                command,
                status_words(0, NSTATUS, CONF_DONE_INIT_DONE),
            )]
        }));
        mbox.wait_fpga_configured_or_halt();
    }

    #[test]
    #[should_panic(expected = "fatal error 0x20001")]
    fn test_fabric_hardware_error_halts() {
        panic_on_fatal_error();
        let (mut mbox, _periph) = channel(SdmMboxPeriph::new(|command| {
            vec![SdmResponse::ok(command, status_words(0, 0, 0))]
        }));
        mbox.wait_fpga_configured_or_halt();
    }

    #[test]
    #[should_panic(expected = "fatal error 0x20003")]
    fn test_rejected_bitstream_halts() {
        panic_on_fatal_error();
        let (mut mbox, _periph) = channel(SdmMboxPeriph::new(|command| {
            // Invalid bitstream, error details carry major/minor codes.
            let words = vec![CFGSTAT_STATE_ERROR_INVALID, 0x0102, NSTATUS, 0, 0x40, 0xf001_0003];
            vec![SdmResponse::ok(command, words)]
        }));
        mbox.wait_fpga_configured_or_halt();
    }

    #[test]
    #[should_panic(expected = "fatal error 0x10003")]
    fn test_unanswered_status_query_halts() {
        panic_on_fatal_error();
        let (mut mbox, _periph) = channel(SdmMboxPeriph::new(|command| {
            vec![SdmResponse::error(command, RespCode::INVALID_COMMAND)]
        }));
        mbox.wait_fpga_configured_or_halt();
    }

    #[test]
    fn test_qspi_open_and_close() {
        let (mut mbox, periph) = channel(SdmMboxPeriph::default());
        mbox.qspi_open().unwrap();
        mbox.qspi_close().unwrap();
        assert_eq!(
            commands(&periph.received()),
            vec![
                CommandId::QSPI_OPEN,
                CommandId::QSPI_DIRECT,
                CommandId::QSPI_CLOSE
            ]
        );
    }

    #[test]
    fn test_qspi_open_stops_at_refusal() {
        let (mut mbox, periph) = channel(SdmMboxPeriph::new(|command| {
            vec![SdmResponse::error(command, RespCode::NOT_CONFIGURED)]
        }));
        assert_eq!(mbox.qspi_open(), Err(SdmMboxError::CmdFailed(0x100)));
        assert_eq!(commands(&periph.received()), vec![CommandId::QSPI_OPEN]);
    }

    #[test]
    fn test_hps_stage_notify() {
        let (mut mbox, periph) = channel(SdmMboxPeriph::default());
        mbox.hps_stage_notify(HpsExecutionState::Ssbl).unwrap();

        let received = periph.received();
        assert_eq!(received[0].command(), CommandId::HPS_STAGE_NOTIFY);
        assert_eq!(received[0].header.len, 1);
        assert_eq!(received[0].args, vec![1]);
    }

    #[test]
    fn test_rsu_status_and_idcode() {
        let (mut mbox, _periph) = channel(SdmMboxPeriph::new(|command| {
            match command.command() {
                CommandId::RSU_STATUS => vec![SdmResponse::ok(command, (1..=9).collect())],
                CommandId::GET_IDCODE => vec![SdmResponse::ok(command, vec![0x02d0_10dd])],
                _ => vec![SdmResponse::error(command, RespCode::INVALID_COMMAND)],
            }
        }));

        let mut rsu = [0u32; RSU_STATUS_RESP_LEN];
        assert_eq!(mbox.rsu_status(&mut rsu), Ok(RSU_STATUS_RESP_LEN));
        assert_eq!(rsu, [1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(mbox.get_idcode(), Ok(0x02d0_10dd));
    }

    #[test]
    fn test_idcode_without_data() {
        let (mut mbox, _periph) = channel(SdmMboxPeriph::default());
        assert_eq!(
            mbox.get_idcode(),
            Err(SdmMboxError::CmdFailed(RespCode::NO_VALID_RESP_AVAILABLE.0))
        );
    }
}
