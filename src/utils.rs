use crate::bus::Bus;

/// Hex + ASCII dump of bus memory. Goes through `peek`, so dumping an
/// I/O region never fires register side effects.
pub fn hexdump(bus: &Bus, start: u16, end: u16) -> String {
    let mut out = String::new();
    let mut addr = start;
    loop {
        let mut line = format!("{:04x}: ", addr);
        let mut chars = String::new();
        for _ in 0..16 {
            let byte = bus.peek(addr);
            line.push_str(&format!("{:02x} ", byte));
            let c = byte as char;
            chars.push(if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '.'
            });

            if addr == end {
                out.push_str(&format!("{:<54} {}\n", line, chars));
                return out;
            }
            addr = addr.wrapping_add(1);
        }

        out.push_str(&format!("{:<54} {}\n", line, chars));

        if addr == 0 {
            // Wrapped past the top of the address space.
            return out;
        }
    }
}
