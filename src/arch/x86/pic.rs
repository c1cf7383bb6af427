//! Programmable Interrupt Controller (8259 PIC)
//!
//! Standard dual-PIC (master/slave) cascade init and EOI.

use super::port::{Port, PortWriteOnly};
use spin::Mutex;

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

const ICW1_INIT: u8 = 0x11;
const ICW4_8086: u8 = 0x01;
const PIC_EOI: u8 = 0x20;

/// A chained pair of 8259 PICs remapped to a non-overlapping vector range.
pub struct ChainedPics {
    pics: [Pic; 2],
}

impl ChainedPics {
    /// Builds a chain remapped to start at `offset1`/`offset2`.
    #[must_use]
    pub const fn new(offset1: u8, offset2: u8) -> Self {
        Self {
            pics: [
                Pic {
                    offset: offset1,
                    command: PortWriteOnly::new(PIC1_COMMAND),
                    data: PortWriteOnly::new(PIC1_DATA),
                },
                Pic {
                    offset: offset2,
                    command: PortWriteOnly::new(PIC2_COMMAND),
                    data: PortWriteOnly::new(PIC2_DATA),
                },
            ],
        }
    }

    /// Runs the standard ICW1-ICW4 remap sequence.
    ///
    /// # Safety
    /// Must be called exactly once, before unmasking any IRQ.
    pub unsafe fn initialize(&mut self) {
        unsafe {
            let mut wait_port: PortWriteOnly<u8> = PortWriteOnly::new(0x80);
            let mut wait = || wait_port.write(0);

            self.pics[0].command.write(ICW1_INIT);
            wait();
            self.pics[1].command.write(ICW1_INIT);
            wait();

            self.pics[0].data.write(self.pics[0].offset);
            wait();
            self.pics[1].data.write(self.pics[1].offset);
            wait();

            self.pics[0].data.write(4);
            wait();
            self.pics[1].data.write(2);
            wait();

            self.pics[0].data.write(ICW4_8086);
            wait();
            self.pics[1].data.write(ICW4_8086);
            wait();

            self.pics[0].data.write(0xfb);
            self.pics[1].data.write(0xff);
        }
    }

    /// Sends end-of-interrupt for `interrupt_id`, cascading to the slave
    /// PIC first when it owns the IRQ.
    ///
    /// # Safety
    /// `interrupt_id` must be the vector of the interrupt currently being
    /// serviced.
    pub unsafe fn notify_end_of_interrupt(&mut self, interrupt_id: u8) {
        unsafe {
            if self.handles_interrupt(interrupt_id) {
                if self.pics[1].handles_interrupt(interrupt_id) {
                    self.pics[1].end_of_interrupt();
                }
                self.pics[0].end_of_interrupt();
            }
        }
    }

    fn handles_interrupt(&self, interrupt_id: u8) -> bool {
        self.pics.iter().any(|p| p.handles_interrupt(interrupt_id))
    }

    /// Unmasks IRQ line `irq` (0-15).
    ///
    /// # Safety
    /// Must be called after [`Self::initialize`].
    pub unsafe fn unmask_irq(&mut self, irq: u8) {
        unsafe {
            let mut port: Port<u8>;
            if irq < 8 {
                port = Port::new(PIC1_DATA);
                let value = port.read();
                port.write(value & !(1 << irq));
            } else {
                port = Port::new(PIC2_DATA);
                let value = port.read();
                port.write(value & !(1 << (irq - 8)));
            }
        }
    }
}

struct Pic {
    offset: u8,
    command: PortWriteOnly<u8>,
    data: PortWriteOnly<u8>,
}

impl Pic {
    const fn handles_interrupt(&self, interrupt_id: u8) -> bool {
        self.offset <= interrupt_id && interrupt_id < self.offset + 8
    }

    unsafe fn end_of_interrupt(&mut self) {
        unsafe {
            self.command.write(PIC_EOI);
        }
    }
}

/// Master remapped to vector 32 (0x20), slave to 40 (0x28).
pub static PICS: Mutex<ChainedPics> = Mutex::new(ChainedPics::new(0x20, 0x28));
