// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{channel, echo, request};
    use emulator_periph::{SdmMboxPeriph, SdmResponse};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use romtime::sdm_mbox::{Request, CMD_BUF_WORDS};
    use romtime::SdmMboxError;
    use sdm_mbox_common::{CommandId, RespCode};

    #[test]
    fn test_ring_invariant_with_slow_far_end() {
        let periph = echo();
        periph.set_service_interval_us(2000);
        periph.set_consume_per_service(3);
        let (mut mbox, periph) = channel(periph);

        let mut rng = StdRng::seed_from_u64(0x5d3);
        let mut resp = [0u32; 80];
        for round in 0..40 {
            let args: Vec<u32> = (0..rng.gen_range(0..=70)).map(|_| rng.gen()).collect();
            let outcome = mbox
                .call(&request(CommandId::RSU_STATUS, &args), &mut resp)
                .unwrap();
            assert_eq!(outcome.code, RespCode::OK, "round {round}");
            assert_eq!(&resp[..outcome.len], &args[..], "round {round}");
        }

        assert_eq!(periph.ring_violations(), 0);
        assert_eq!(periph.received().len(), 40);
        let regs = periph.snapshot();
        assert_eq!(regs.cin, regs.cout);
        assert_eq!(regs.rin, regs.rout);
    }

    #[test]
    fn test_wraps_past_ring_end() {
        let periph = echo();
        periph.set_ring_positions(CMD_BUF_WORDS - 2, 14);
        let (mut mbox, periph) = channel(periph);

        let args = [1, 2, 3, 4, 5];
        let mut resp = [0u32; 5];
        let outcome = mbox
            .call(&request(CommandId::RSU_STATUS, &args), &mut resp)
            .unwrap();
        assert_eq!(outcome.len, 5);
        assert_eq!(resp, args);

        let regs = periph.snapshot();
        assert_eq!(regs.cin, 4);
        assert_eq!(regs.cout, 4);
        assert_eq!(regs.rin, 4);
        assert_eq!(regs.rout, 4);
        assert_eq!(periph.ring_violations(), 0);
    }

    #[test]
    fn test_overflow_rings_doorbell_once_per_episode() {
        let periph = SdmMboxPeriph::default();
        // Each wake-up drains everything, but only every 5 ms.
        periph.set_service_interval_us(5000);
        let (mut mbox, periph) = channel(periph);

        // 71 words: fills the 31 usable slots twice, then a tail of 9.
        let args: Vec<u32> = (0..70).collect();
        let outcome = mbox
            .call(&request(CommandId::RSU_STATUS, &args), &mut [])
            .unwrap();
        assert_eq!(outcome.code, RespCode::OK);

        // Two full episodes plus the doorbell announcing the tail.
        assert_eq!(periph.doorbells_to_sdm(), 3);
        assert_eq!(periph.ring_violations(), 0);
        let received = periph.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].args, args);
    }

    #[test]
    fn test_single_doorbell_without_overflow() {
        let (mut mbox, periph) = channel(echo());
        let args = [0u32; 20];
        mbox.call(&request(CommandId::RSU_STATUS, &args), &mut [])
            .unwrap();
        assert_eq!(periph.doorbells_to_sdm(), 1);
    }

    #[test]
    fn test_stuck_ring_times_out() {
        let periph = SdmMboxPeriph::default();
        periph.set_consume_per_service(0);
        let (mut mbox, periph) = channel(periph);

        let args = [0u32; 40];
        let result = mbox.call(&request(CommandId::RSU_STATUS, &args), &mut []);
        assert_eq!(result, Err(SdmMboxError::Timeout));
        assert_eq!(periph.now_us(), 1_000_000);
        assert_eq!(periph.doorbells_to_sdm(), 1);
        assert_eq!(periph.ring_violations(), 0);
    }

    #[test]
    fn test_invalid_command_never_reaches_ring() {
        let (mut mbox, periph) = channel(echo());
        let result = mbox.call_with_retry(&request(CommandId(0x800), &[]), &mut []);
        assert_eq!(result, Err(SdmMboxError::InvalidCommand));

        let regs = periph.snapshot();
        assert_eq!(regs.cin, 0);
        assert_eq!(regs.doorbell_to_sdm, 0);
        assert_eq!(periph.doorbells_to_sdm(), 0);
        assert_eq!(periph.now_us(), 0);
    }

    #[test]
    fn test_overflowed_message_times_out_when_far_end_hangs() {
        let periph = SdmMboxPeriph::default();
        periph.set_consume_limit(Some(20));
        let (mut mbox, periph) = channel(periph);

        // 41 words: 31 fill the ring, the far end takes 20 and then hangs.
        let args = [0u32; 40];
        let result = mbox.call(&request(CommandId::RSU_STATUS, &args), &mut []);
        assert_eq!(result, Err(SdmMboxError::Timeout));
        // 1 ms for the overflow wake-up, then 2 s waiting for the drain.
        assert_eq!(periph.now_us(), 2_001_000);

        let regs = periph.snapshot();
        assert_eq!(regs.cout, 20);
        assert_eq!(regs.cin, 41 % CMD_BUF_WORDS);
        assert_eq!(periph.doorbells_to_sdm(), 2);
        assert_eq!(periph.ring_violations(), 0);
        assert!(periph.received().is_empty());
    }

    #[test]
    fn test_uncorrelatable_ids_never_reach_ring() {
        let (mut mbox, periph) = channel(echo());
        for (client, id) in [(1, 16), (16, 1), (0x21, 0x31)] {
            let req = Request {
                client,
                id,
                ..request(CommandId::RSU_STATUS, &[7])
            };
            assert_eq!(mbox.call(&req, &mut []), Err(SdmMboxError::InvalidCommand));
            assert_eq!(mbox.post(&req), Err(SdmMboxError::InvalidCommand));
        }

        let regs = periph.snapshot();
        assert_eq!(regs.cin, 0);
        assert_eq!(regs.doorbell_to_sdm, 0);
        assert_eq!(periph.doorbells_to_sdm(), 0);
        assert!(periph.received().is_empty());
        assert_eq!(periph.now_us(), 0);

        // The largest ids the header holds still correlate.
        let req = Request {
            client: 15,
            id: 15,
            ..request(CommandId::RSU_STATUS, &[7])
        };
        let mut resp = [0u32; 1];
        assert_eq!(mbox.call_with_retry(&req, &mut resp), Ok(1));
        assert_eq!(resp, [7]);
    }

    #[test]
    fn test_harvest_leaves_remainder_in_ring() {
        let periph = SdmMboxPeriph::new(|command| {
            vec![SdmResponse::ok(command, vec![0xa1, 0xa2, 0xa3, 0xa4])]
        });
        let (mut mbox, periph) = channel(periph);

        mbox.post(&request(CommandId::RECONFIG, &[0x1000, 0x40]))
            .unwrap();
        assert_eq!(periph.doorbells_to_sdm(), 1);
        periph.advance_us(1000);
        assert_eq!(periph.snapshot().doorbell_from_sdm, 1);

        let mut out = [0u32; 3];
        assert_eq!(mbox.harvest_available(&mut out[..2]), 2);
        // client 1, id 1, four words, OK
        assert_eq!(out[..2], [0x1100_4000, 0xa1]);
        assert_eq!(periph.snapshot().doorbell_from_sdm, 0);

        assert_eq!(mbox.harvest_available(&mut out), 3);
        assert_eq!(out, [0xa2, 0xa3, 0xa4]);
        assert_eq!(mbox.harvest_available(&mut out), 0);

        let regs = periph.snapshot();
        assert_eq!(regs.rout, 5);
        assert_eq!(regs.rin, 5);
    }
}
