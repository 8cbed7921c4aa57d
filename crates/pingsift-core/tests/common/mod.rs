#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use etherparse::PacketBuilder;

pub const LINKTYPE_ETHERNET: u32 = 1;
pub const LINKTYPE_RAW: u32 = 101;

const PCAPNG_SECTION_HEADER: u32 = 0x0A0D_0D0A;
const PCAPNG_INTERFACE_DESCRIPTION: u32 = 1;
const PCAPNG_ENHANCED_PACKET: u32 = 6;
const PCAPNG_BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;
const PCAP_MAGIC_MICROS: u32 = 0xA1B2_C3D4;
const PCAP_MAGIC_NANOS: u32 = 0xA1B2_3C4D;

/// Send time carried by every probe built here: 2024-08-16 16:09:36.789 UTC.
pub const PROBE_SEND_MS: u64 = 1_723_824_576_789;

/// Temp file path unique to this test run.
pub fn temp_capture(name: &str, extension: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("pingsift_{name}_{unique}.{extension}"))
}

/// 16-byte probe header: `LOVE` magic, TTL 64, round 3, tweak 0x01ff.
pub fn probe_header() -> Vec<u8> {
    let mut header = Vec::with_capacity(16);
    header.extend_from_slice(b"LOVE");
    header.push(64);
    header.push(3);
    header.extend_from_slice(&0x01ffu16.to_be_bytes());
    header.extend_from_slice(&PROBE_SEND_MS.to_le_bytes());
    header
}

pub fn echo_payload() -> Vec<u8> {
    (0x20u8..0x30).collect()
}

pub fn raw_echo_request(src: [u8; 4], dst: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ipv4(src, dst, 64).icmpv4_echo_request(0x1234, 1);
    let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
    builder.write(&mut packet, payload).unwrap();
    packet
}

pub fn raw_echo_reply(src: [u8; 4], dst: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ipv4(src, dst, 64).icmpv4_echo_reply(0x1234, 1);
    let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
    builder.write(&mut packet, payload).unwrap();
    packet
}

pub fn raw_udp(src: [u8; 4], dst: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ipv4(src, dst, 64).udp(40000, 9);
    let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
    builder.write(&mut packet, payload).unwrap();
    packet
}

pub fn ethernet_echo_request(src: [u8; 4], dst: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4(src, dst, 64)
        .icmpv4_echo_request(0x1234, 1);
    let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
    builder.write(&mut packet, payload).unwrap();
    packet
}

pub fn ethernet_udp(src: [u8; 4], dst: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4(src, dst, 64)
        .udp(40000, 9);
    let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
    builder.write(&mut packet, payload).unwrap();
    packet
}

/// Ethernet frame with a local experimental ethertype and no IP layer.
pub fn ethernet_without_ip() -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&[0xff; 6]);
    frame.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
    frame.extend_from_slice(&0x88B5u16.to_be_bytes());
    frame.extend_from_slice(&[0u8; 46]);
    frame
}

/// Big-endian pcapng file with one interface of `linktype` (microsecond
/// resolution). Packets are `(timestamp_us, frame)`.
pub fn write_pcapng(path: &Path, linktype: u32, packets: &[(u64, Vec<u8>)]) {
    write_pcapng_snapped(path, linktype, u32::MAX, packets);
}

/// Like [`write_pcapng`], keeping at most `snaplen` bytes of each frame while
/// recording its original length.
pub fn write_pcapng_snapped(
    path: &Path,
    linktype: u32,
    snaplen: u32,
    packets: &[(u64, Vec<u8>)],
) {
    let mut output = Vec::new();
    output.extend_from_slice(&pcapng_block(PCAPNG_SECTION_HEADER, &section_header_body()));
    output.extend_from_slice(&pcapng_block(
        PCAPNG_INTERFACE_DESCRIPTION,
        &interface_desc_body(linktype, snaplen),
    ));
    for (ts_us, data) in packets {
        output.extend_from_slice(&pcapng_block(
            PCAPNG_ENHANCED_PACKET,
            &enhanced_packet_body(*ts_us, data, snaplen),
        ));
    }
    fs::write(path, output).unwrap();
}

/// Little-endian legacy pcap file. Packets are `(seconds, fraction, frame)`
/// where the fraction is in micro- or nanoseconds depending on `nanosecond`.
pub fn write_legacy_pcap(
    path: &Path,
    linktype: u32,
    nanosecond: bool,
    packets: &[(u32, u32, Vec<u8>)],
) {
    let magic = if nanosecond {
        PCAP_MAGIC_NANOS
    } else {
        PCAP_MAGIC_MICROS
    };
    let mut output = Vec::new();
    output.extend_from_slice(&magic.to_le_bytes());
    output.extend_from_slice(&2u16.to_le_bytes());
    output.extend_from_slice(&4u16.to_le_bytes());
    output.extend_from_slice(&0i32.to_le_bytes());
    output.extend_from_slice(&0u32.to_le_bytes());
    output.extend_from_slice(&65535u32.to_le_bytes());
    output.extend_from_slice(&linktype.to_le_bytes());
    for (sec, frac, data) in packets {
        let len = data.len() as u32;
        output.extend_from_slice(&sec.to_le_bytes());
        output.extend_from_slice(&frac.to_le_bytes());
        output.extend_from_slice(&len.to_le_bytes());
        output.extend_from_slice(&len.to_le_bytes());
        output.extend_from_slice(data);
    }
    fs::write(path, output).unwrap();
}

fn pcapng_block(block_type: u32, body: &[u8]) -> Vec<u8> {
    let total_len = (8 + body.len() + 4) as u32;
    let mut block = Vec::with_capacity(total_len as usize);
    block.extend_from_slice(&block_type.to_be_bytes());
    block.extend_from_slice(&total_len.to_be_bytes());
    block.extend_from_slice(body);
    block.extend_from_slice(&total_len.to_be_bytes());
    block
}

fn section_header_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&PCAPNG_BYTE_ORDER_MAGIC.to_be_bytes());
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&(-1i64).to_be_bytes());
    body
}

fn interface_desc_body(linktype: u32, snaplen: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(linktype as u16).to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&snaplen.min(65535).to_be_bytes());
    body
}

fn enhanced_packet_body(ts_us: u64, data: &[u8], snaplen: u32) -> Vec<u8> {
    let ts_high = (ts_us >> 32) as u32;
    let ts_low = (ts_us & 0xFFFF_FFFF) as u32;
    let orig_len = data.len() as u32;
    let cap_len = orig_len.min(snaplen);
    let data = &data[..cap_len as usize];
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&ts_high.to_be_bytes());
    body.extend_from_slice(&ts_low.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(&orig_len.to_be_bytes());
    body.extend_from_slice(data);
    let pad_len = (4 - (data.len() % 4)) % 4;
    body.extend(std::iter::repeat_n(0u8, pad_len));
    body
}
