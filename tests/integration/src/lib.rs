// Licensed under the Apache-2.0 license

mod test_sdm_mbox_boot;
mod test_sdm_mbox_ring;

#[cfg(test)]
mod test {
    use emulator_periph::{SdmMboxPeriph, SdmResponse};
    use log::LevelFilter;
    use romtime::sdm_mbox::{Request, SdmMailbox};
    use romtime::{set_fatal_error_handler, FatalErrorHandler};
    use sdm_config::SdmMailboxConfig;
    use sdm_mbox_common::CommandId;
    use simple_logger::SimpleLogger;
    use std::sync::Once;

    pub type TestMailbox = SdmMailbox<SdmMboxPeriph>;

    pub fn init_logger() {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
    }

    /// Firmware handle and test handle onto the same emulated far end.
    pub fn channel(periph: SdmMboxPeriph) -> (TestMailbox, SdmMboxPeriph) {
        channel_with_config(periph, SdmMailboxConfig::default())
    }

    pub fn channel_with_config(
        periph: SdmMboxPeriph,
        config: SdmMailboxConfig,
    ) -> (TestMailbox, SdmMboxPeriph) {
        init_logger();
        (SdmMailbox::new(periph.clone(), config), periph)
    }

    /// Far end that answers every command with its own arguments.
    pub fn echo() -> SdmMboxPeriph {
        SdmMboxPeriph::new(|command| vec![SdmResponse::ok(command, command.args.clone())])
    }

    pub fn request(command: CommandId, args: &[u32]) -> Request<'_> {
        Request {
            client: 1,
            id: 1,
            command,
            args,
            indirect: false,
        }
    }

    struct PanicOnFatal;

    impl FatalErrorHandler for PanicOnFatal {
        fn fatal_error(&mut self, code: u32) -> ! {
            panic!("fatal error {:#x}", code);
        }
    }

    static FATAL_HANDLER: Once = Once::new();

    /// Turns the fatal halt into a panic the test harness can observe.
    pub fn panic_on_fatal_error() {
        FATAL_HANDLER.call_once(|| {
            set_fatal_error_handler(Box::leak(Box::new(PanicOnFatal)));
        });
    }
}
