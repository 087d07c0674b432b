use serde::{Deserialize, Serialize};

/// Select/data register pair at offsets 0 and 1.
pub const REG_SELECT: u16 = 0;
pub const REG_DATA: u16 = 1;

const REGISTER_COUNT: usize = 18;

const R_DISPLAY_START_H: usize = 12;
const R_DISPLAY_START_L: usize = 13;
const R_CURSOR_POS_H: usize = 14;
const R_CURSOR_POS_L: usize = 15;

/// 6545-style CRT controller. The processor selects one of eighteen
/// internal registers through the address port, then transfers through
/// the data port. Only R12-R17 read back; the rest are write-only and
/// read as zero, as on the real part. Rendering is left to the front
/// end, which pulls geometry through the accessors here.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Crtc {
    selected: u8,
    registers: [u8; REGISTER_COUNT],
}

impl Default for Crtc {
    fn default() -> Self {
        Crtc {
            selected: 0,
            registers: [0; REGISTER_COUNT],
        }
    }
}

impl Crtc {
    pub fn new() -> Self {
        Crtc::default()
    }

    pub fn reset(&mut self) {
        *self = Crtc::default();
    }

    pub fn size(&self) -> u32 {
        2
    }

    /// First address of the character buffer in bus memory (R12:R13).
    pub fn display_start(&self) -> u16 {
        ((self.registers[R_DISPLAY_START_H] as u16) << 8)
            | self.registers[R_DISPLAY_START_L] as u16
    }

    /// Cursor cell address in bus memory (R14:R15).
    pub fn cursor_position(&self) -> u16 {
        ((self.registers[R_CURSOR_POS_H] as u16) << 8) | self.registers[R_CURSOR_POS_L] as u16
    }

    pub fn columns(&self) -> u8 {
        self.registers[1]
    }

    pub fn rows(&self) -> u8 {
        self.registers[6]
    }

    pub fn read(&mut self, offset: u16) -> u8 {
        self.peek(offset)
    }

    pub fn peek(&self, offset: u16) -> u8 {
        match offset {
            REG_SELECT => 0,
            REG_DATA => match self.selected as usize {
                r @ R_DISPLAY_START_H..=17 => self.registers[r],
                _ => 0,
            },
            _ => 0,
        }
    }

    pub fn write(&mut self, offset: u16, value: u8) {
        match offset {
            REG_SELECT => self.selected = value,
            REG_DATA => {
                let r = self.selected as usize;
                if r < REGISTER_COUNT {
                    self.registers[r] = value;
                } else {
                    tracing::trace!("write to nonexistent register R{}", r);
                }
            }
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_registers_read_back() {
        let mut crtc = Crtc::new();
        crtc.write(REG_SELECT, 14);
        crtc.write(REG_DATA, 0x70);
        crtc.write(REG_SELECT, 15);
        crtc.write(REG_DATA, 0x22);

        assert_eq!(crtc.cursor_position(), 0x7022);
        assert_eq!(crtc.peek(REG_DATA), 0x22);
    }

    #[test]
    fn write_only_registers_read_zero() {
        let mut crtc = Crtc::new();
        crtc.write(REG_SELECT, 1);
        crtc.write(REG_DATA, 80);

        assert_eq!(crtc.columns(), 80);
        assert_eq!(crtc.read(REG_DATA), 0);
    }
}
