// lib95hf/src/constants.rs
//! Transceiver command codes, status codes and RF protocol constants

/// Command frame offsets: [code][len][data...]
pub const COMMAND_OFFSET: usize = 0;
pub const LENGTH_OFFSET: usize = 1;
pub const DATA_OFFSET: usize = 2;

/// Largest data field a single chip frame can carry.
pub const MAX_BUFFER_SIZE: usize = 255;

// Chip command codes
pub const CMD_IDN: u8 = 0x01;
pub const CMD_PROTOCOL_SELECT: u8 = 0x02;
pub const CMD_POLL_FIELD: u8 = 0x03;
pub const CMD_SEND_RECEIVE: u8 = 0x04;
pub const CMD_LISTEN: u8 = 0x05;
pub const CMD_SEND: u8 = 0x06;
pub const CMD_IDLE: u8 = 0x07;
pub const CMD_READ_REGISTER: u8 = 0x08;
pub const CMD_WRITE_REGISTER: u8 = 0x09;
pub const CMD_BAUD_RATE: u8 = 0x0A;
pub const CMD_AC_FILTER: u8 = 0x0D;
pub const CMD_ECHO: u8 = 0x55;

/// Sentinel returned by the chip for ECHO (and as the BAUD_RATE pseudo reply)
pub const ECHO_RESPONSE: u8 = 0x55;

/// Status written in place of a reply when the chip never answered
pub const STATUS_NO_REPLY: u8 = 0xFF;

// Generic result codes
pub const STATUS_OK: u8 = 0x00;
pub const STATUS_INVALID_LENGTH: u8 = 0x82;
pub const STATUS_INVALID_PROTOCOL: u8 = 0x83;

// SEND_RECEIVE result codes
pub const SENDRECV_OK: u8 = 0x80;
pub const SENDRECV_RESIDUAL: u8 = 0x90;
pub const SENDRECV_COM_ERROR: u8 = 0x86;
pub const SENDRECV_FRAME_WAIT_TIMEOUT: u8 = 0x87;
pub const SENDRECV_INVALID_SOF: u8 = 0x88;
pub const SENDRECV_OVERFLOW: u8 = 0x89;
pub const SENDRECV_FRAMING: u8 = 0x8A;
pub const SENDRECV_EGT: u8 = 0x8B;
pub const SENDRECV_LENGTH: u8 = 0x8C;
pub const SENDRECV_CRC: u8 = 0x8D;
pub const SENDRECV_RECEPTION_LOST: u8 = 0x8E;

// Card-emulation (listen) result codes
pub const LISTEN_DATA: u8 = 0x80;
pub const LISTEN_NO_FIELD: u8 = 0x8F;

// Protocol identifiers for PROTOCOL_SELECT in reader mode
pub const PROTOCOL_FIELD_OFF: u8 = 0x00;
pub const PROTOCOL_ISO15693: u8 = 0x01;
pub const PROTOCOL_ISO14443A: u8 = 0x02;
pub const PROTOCOL_ISO14443B: u8 = 0x03;
pub const PROTOCOL_FELICA: u8 = 0x04;

/// Protocol identifier for ISO14443A card emulation
pub const PROTOCOL_CARD_EMULATION_14443A: u8 = 0x12;

/// Card-emulation parameter byte at 106, 212 and 424 kbit/s
pub const PICC_PARAMETER_14443A_106: u8 = 0x08;
pub const PICC_PARAMETER_14443A_212: u8 = 0x5A;
pub const PICC_PARAMETER_14443A_424: u8 = 0xAA;

// Trailing control bytes appended by the chip to received RF frames
pub const ISO14443A_CONTROL_LEN: usize = 3;
pub const ISO14443A_CRC_ERROR_MASK: u8 = 0x20;
pub const SINGLE_CONTROL_LEN: usize = 1;
pub const SINGLE_CONTROL_CRC_ERROR_MASK: u8 = 0x02;

/// Inbound PICC frame trailer: two CRC bytes plus one status byte
pub const PICC_RX_TRAILER_LEN: usize = 3;

/// Control byte asking the chip to append CRC and send 8 bits of the last byte
pub const SEND_APPEND_CRC: u8 = 0x20;
pub const SEND_8BITS_IN_LAST_BYTE: u8 = 0x08;
pub const SEND_CONTROL_CRC_8BITS: u8 = SEND_APPEND_CRC | SEND_8BITS_IN_LAST_BYTE;

// Analog configuration registers
pub const REG_ARC_B: u8 = 0x68;
pub const REG_TIMER_WINDOW: u8 = 0x3A;
pub const REG_AUTO_DETECT: u8 = 0x0A;

/// Index of the load modulation setting behind REG_ARC_B
pub const REG_INDEX_LOAD_MODULATION: u8 = 0x04;

/// UID used for every ISO14443A-based emulation (cascade tag, manufacturer, serial)
pub const EMULATED_UID_A: [u8; 10] = [0x88, 0x02, 0x80, 0x74, 0x4A, 0xEF, 0x22, 0x80, 0x00, 0x00];

/// UID bytes loaded into the anticollision filter
pub const AC_FILTER_UID_LEN: usize = 8;

/// ATQA announced in card-emulation mode
pub const EMULATED_ATQA: [u8; 2] = [0x44, 0x00];

/// Backscattering load applied when entering card-emulation mode
pub const BACKSCATTER_LOAD: u8 = 0x27;

/// Number of echo probes (UART) before giving up inside one POR attempt
pub const UART_PROBE_LIMIT: usize = MAX_BUFFER_SIZE;

/// Outer POR attempts
pub const POR_ATTEMPTS: usize = 5;
