/// PCAPNG section header block type, as it appears on disk.
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

/// Nanosecond-resolution legacy PCAP magic, big- and little-endian.
pub const PCAP_NANOS_MAGIC_BE: [u8; 4] = [0xa1, 0xb2, 0x3c, 0x4d];
pub const PCAP_NANOS_MAGIC_LE: [u8; 4] = [0x4d, 0x3c, 0xb2, 0xa1];

pub const PCAP_READER_BUFFER_SIZE: usize = 64 * 1024;

/// `if_tsresol` default when the option is absent (microseconds).
pub const PCAPNG_DEFAULT_TSRESOL: u8 = 6;
/// High bit of `if_tsresol` selects a power-of-two resolution.
pub const PCAPNG_TSRESOL_BINARY_FLAG: u8 = 0x80;
