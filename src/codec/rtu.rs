//! Modbus-RTU framing for outbound commands.

/// Reflected form of the Modbus polynomial 0x8005.
const POLY_REFLECTED: u16 = 0xA001;

/// CRC-16/MODBUS (init 0xFFFF, LSB-first, no final XOR).
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLY_REFLECTED;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Append the CRC to an address + function + payload frame, low byte first.
pub(super) fn seal(mut frame: Vec<u8>) -> Vec<u8> {
    let crc = crc16_modbus(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}
