/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Behavioral models of the peripherals the bootloader talks to.

--*/

mod sdm_mbox;

pub use sdm_mbox::{ReceivedCommand, SdmMboxPeriph, SdmMboxSnapshot, SdmResponse};
