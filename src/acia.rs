use std::collections::VecDeque;

use derivative::Derivative;
use serde::{Deserialize, Serialize};

pub const REG_DATA: u16 = 0;
pub const REG_STATUS: u16 = 1;
pub const REG_COMMAND: u16 = 2;
pub const REG_CONTROL: u16 = 3;

/// Status register bits.
pub const STATUS_OVERRUN: u8 = 0x04;
pub const STATUS_RX_FULL: u8 = 0x08;
pub const STATUS_TX_EMPTY: u8 = 0x10;
pub const STATUS_IRQ: u8 = 0x80;

/// Command register bits.
const CMD_RX_IRQ_ENABLE: u8 = 0x02;
const CMD_ECHO: u8 = 0x08;

const RX_FIFO_CAPACITY: usize = 256;

/// 6551-style serial controller: data, status, command and control
/// registers over four bus offsets.
///
/// Register reads carry hardware side effects: reading the data register
/// pops the receive FIFO and reading the status register clears the
/// interrupt flag. `peek` reports the same values without the side
/// effects so inspectors can poll freely.
#[derive(Derivative, Serialize, Deserialize)]
#[derivative(Debug, PartialEq)]
pub struct Acia {
    rx_fifo: VecDeque<u8>,
    command: u8,
    control: u8,
    overrun: bool,
    irq: bool,

    #[serde(skip)]
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    on_transmit: Option<Box<dyn FnMut(u8) + Send>>,
}

impl Default for Acia {
    fn default() -> Self {
        Acia {
            rx_fifo: VecDeque::new(),
            command: 0,
            control: 0,
            overrun: false,
            irq: false,
            on_transmit: None,
        }
    }
}

impl Acia {
    pub fn new() -> Self {
        Acia::default()
    }

    /// Register a transmit hook; invoked once per byte the processor
    /// writes to the data register.
    pub fn set_transmit<F>(&mut self, hook: F)
    where
        F: FnMut(u8) + Send + 'static,
    {
        self.on_transmit = Some(Box::new(hook));
    }

    /// Feed a byte in from the outside world (terminal, test harness).
    /// Full FIFO drops the byte and latches the overrun bit.
    pub fn receive(&mut self, byte: u8) {
        if self.rx_fifo.len() >= RX_FIFO_CAPACITY {
            tracing::warn!("receive FIFO full, dropping {:#04X}", byte);
            self.overrun = true;
            return;
        }

        self.rx_fifo.push_back(byte);

        if self.command & CMD_RX_IRQ_ENABLE != 0 {
            self.irq = true;
        }
        if self.command & CMD_ECHO != 0 {
            self.transmit(byte);
        }
    }

    pub fn reset(&mut self) {
        self.rx_fifo.clear();
        self.command = 0;
        self.control = 0;
        self.overrun = false;
        self.irq = false;
    }

    pub fn size(&self) -> u32 {
        4
    }

    pub fn irq_asserted(&self) -> bool {
        self.irq
    }

    fn status(&self) -> u8 {
        let mut status = STATUS_TX_EMPTY;
        if !self.rx_fifo.is_empty() {
            status |= STATUS_RX_FULL;
        }
        if self.overrun {
            status |= STATUS_OVERRUN;
        }
        if self.irq {
            status |= STATUS_IRQ;
        }
        status
    }

    fn transmit(&mut self, byte: u8) {
        tracing::trace!("transmit {:#04X}", byte);
        if let Some(hook) = &mut self.on_transmit {
            hook(byte);
        }
    }

    pub fn read(&mut self, offset: u16) -> u8 {
        match offset {
            REG_DATA => {
                self.overrun = false;
                self.irq = false;
                self.rx_fifo.pop_front().unwrap_or(0)
            }
            REG_STATUS => {
                let status = self.status();
                // The interrupt flag reads once and clears.
                self.irq = false;
                status
            }
            REG_COMMAND => self.command,
            REG_CONTROL => self.control,
            _ => 0,
        }
    }

    pub fn peek(&self, offset: u16) -> u8 {
        match offset {
            REG_DATA => self.rx_fifo.front().copied().unwrap_or(0),
            REG_STATUS => self.status(),
            REG_COMMAND => self.command,
            REG_CONTROL => self.control,
            _ => 0,
        }
    }

    pub fn write(&mut self, offset: u16, value: u8) {
        match offset {
            REG_DATA => self.transmit(value),
            REG_STATUS => {
                // A write to the status register is a programmed reset.
                self.reset();
            }
            REG_COMMAND => self.command = value,
            REG_CONTROL => self.control = value,
            _ => (),
        }
    }
}
