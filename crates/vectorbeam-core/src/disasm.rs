//! Table-driven one-line disassembly.
//!
//! Renders the instruction at an address using only side-effect-free bus
//! reads, so tracing never perturbs peripheral state. Returns the text
//! and the instruction's byte length so callers can walk a region.

use std::fmt::Write as _;

use crate::decoder::{lookup_op, AddressingMode, Page};
use crate::memory::Bus;

/// Disassembles the instruction at `addr`; returns the rendered line and
/// its length in bytes. Illegal encodings render as `???` with length 1
/// past any prefix.
#[must_use]
pub fn disassemble(bus: &Bus, addr: u16) -> (String, u16) {
    let first = bus.read_raw(addr);
    let (page, opcode, mut len) = match first {
        0x10 => (Page::P10, bus.read_raw(addr.wrapping_add(1)), 2),
        0x11 => (Page::P11, bus.read_raw(addr.wrapping_add(1)), 2),
        _ => (Page::P0, first, 1),
    };

    let Some(info) = lookup_op(page, opcode) else {
        return (format!("??? (${opcode:02X})"), len);
    };

    let mut text = String::from(info.mnemonic);
    let operand = addr.wrapping_add(len);
    match info.mode {
        AddressingMode::Inherent => {}
        AddressingMode::Immediate8 => {
            let byte = bus.read_raw(operand);
            len += 1;
            match info.mnemonic {
                "EXG" | "TFR" => {
                    let _ = write!(
                        text,
                        " {},{}",
                        interchange_name(byte >> 4),
                        interchange_name(byte & 0x0F)
                    );
                }
                "PSHS" | "PULS" => push_list(&mut text, byte, "U"),
                "PSHU" | "PULU" => push_list(&mut text, byte, "S"),
                _ => {
                    let _ = write!(text, " #${byte:02X}");
                }
            }
        }
        AddressingMode::Immediate16 => {
            let word = bus.read16_raw(operand);
            len += 2;
            let _ = write!(text, " #${word:04X}");
        }
        AddressingMode::Direct => {
            let byte = bus.read_raw(operand);
            len += 1;
            let _ = write!(text, " <${byte:02X}");
        }
        AddressingMode::Extended => {
            let word = bus.read16_raw(operand);
            len += 2;
            let _ = write!(text, " ${word:04X}");
        }
        AddressingMode::Relative8 => {
            let offset = bus.read_raw(operand) as i8;
            len += 1;
            let target = addr.wrapping_add(len).wrapping_add(offset as u16);
            let _ = write!(text, " ${target:04X}");
        }
        AddressingMode::Relative16 => {
            let offset = bus.read16_raw(operand);
            len += 2;
            let target = addr.wrapping_add(len).wrapping_add(offset);
            let _ = write!(text, " ${target:04X}");
        }
        AddressingMode::Indexed => {
            len += indexed_operand(&mut text, bus, operand);
        }
    }
    (text, len)
}

/// Renders an indexed postbyte (plus offset bytes) and returns the byte
/// count consumed, postbyte included.
fn indexed_operand(text: &mut String, bus: &Bus, addr: u16) -> u16 {
    let postbyte = bus.read_raw(addr);
    let reg = ["X", "Y", "U", "S"][usize::from((postbyte >> 5) & 0x03)];

    if postbyte & 0x80 == 0 {
        let mut offset = postbyte & 0x1F;
        if offset & 0x10 != 0 {
            offset |= 0xE0;
        }
        let _ = write!(text, " {},{reg}", offset as i8);
        return 1;
    }

    let indirect = postbyte & 0x10 != 0;
    let mut body = String::new();
    let mut extra = 0u16;
    match postbyte & 0x0F {
        0x00 => body = format!(",{reg}+"),
        0x01 => body = format!(",{reg}++"),
        0x02 => body = format!(",-{reg}"),
        0x03 => body = format!(",--{reg}"),
        0x04 => body = format!(",{reg}"),
        0x05 => body = format!("B,{reg}"),
        0x06 => body = format!("A,{reg}"),
        0x08 => {
            let offset = bus.read_raw(addr.wrapping_add(1)) as i8;
            extra = 1;
            body = format!("${:02X},{reg}", offset as u8);
        }
        0x09 => {
            let offset = bus.read16_raw(addr.wrapping_add(1));
            extra = 2;
            body = format!("${offset:04X},{reg}");
        }
        0x0B => body = format!("D,{reg}"),
        0x0C => {
            let offset = bus.read_raw(addr.wrapping_add(1)) as i8;
            extra = 1;
            body = format!("${:02X},PCR", offset as u8);
        }
        0x0D => {
            let offset = bus.read16_raw(addr.wrapping_add(1));
            extra = 2;
            body = format!("${offset:04X},PCR");
        }
        0x0F => {
            let target = bus.read16_raw(addr.wrapping_add(1));
            extra = 2;
            body = format!("${target:04X}");
        }
        _ => {
            let _ = write!(text, " ???");
            return 1;
        }
    }

    if indirect {
        let _ = write!(text, " [{body}]");
    } else {
        let _ = write!(text, " {body}");
    }
    1 + extra
}

const fn interchange_name(code: u8) -> &'static str {
    match code & 0x0F {
        0x0 => "D",
        0x1 => "X",
        0x2 => "Y",
        0x3 => "U",
        0x4 => "S",
        0x5 => "PC",
        0x8 => "A",
        0x9 => "B",
        0xA => "CC",
        0xB => "DP",
        _ => "?",
    }
}

fn push_list(text: &mut String, mask: u8, other: &str) {
    let names = [
        (0x01u8, "CC"),
        (0x02, "A"),
        (0x04, "B"),
        (0x08, "DP"),
        (0x10, "X"),
        (0x20, "Y"),
        (0x40, other),
        (0x80, "PC"),
    ];
    let mut first = true;
    for (bit, name) in names {
        if mask & bit != 0 {
            let _ = write!(text, "{}{name}", if first { " " } else { "," });
            first = false;
        }
    }
}
