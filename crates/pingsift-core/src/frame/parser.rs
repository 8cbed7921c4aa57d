use std::net::{IpAddr, Ipv4Addr};

use etherparse::{Icmpv4Type, LaxNetSlice, LaxSlicedPacket, TransportSlice};
use pcap_parser::Linktype;

use super::error::FrameError;
use crate::CapturedFrame;
use crate::source::PacketEvent;

/// Slice a link-layer frame according to its capture link type.
///
/// Slicing is lax: a frame cut short by the capture snap length still yields
/// its IP header as long as that header itself was captured.
///
/// Returns `Ok(None)` for link types that cannot carry a bare IP header.
fn slice_frame(
    linktype: Linktype,
    data: &[u8],
) -> Result<Option<LaxSlicedPacket<'_>>, FrameError> {
    let sliced = match linktype {
        Linktype::ETHERNET => {
            LaxSlicedPacket::from_ethernet(data).map_err(|e| FrameError::Slice(e.to_string()))?
        }
        Linktype::RAW | Linktype::IPV4 | Linktype::IPV6 => {
            LaxSlicedPacket::from_ip(data).map_err(|e| FrameError::Slice(e.to_string()))?
        }
        _ => return Ok(None),
    };
    Ok(Some(sliced))
}

/// Turn a packet event into a [`CapturedFrame`] when it carries an IP layer.
///
/// Returns `Ok(None)` when the frame has no IPv4/IPv6 header.
pub fn capture_frame(event: PacketEvent) -> Result<Option<CapturedFrame>, FrameError> {
    let addresses = {
        let Some(sliced) = slice_frame(event.linktype, &event.data)? else {
            return Ok(None);
        };
        match sliced.net {
            Some(LaxNetSlice::Ipv4(ref ipv4)) => (
                IpAddr::V4(ipv4.header().source_addr()),
                IpAddr::V4(ipv4.header().destination_addr()),
            ),
            Some(LaxNetSlice::Ipv6(ref ipv6)) => (
                IpAddr::V6(ipv6.header().source_addr()),
                IpAddr::V6(ipv6.header().destination_addr()),
            ),
            _ => return Ok(None),
        }
    };

    Ok(Some(CapturedFrame {
        source_address: addresses.0,
        destination_address: addresses.1,
        capture_timestamp: event.ts,
        raw_bytes: event.data,
    }))
}

/// IPv4 ICMP echo request header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub identification: u16,
    pub ttl: u8,
    pub icmp_checksum: u16,
    /// Byte offset of the IP header within the frame.
    pub ip_offset: usize,
}

/// Parse an IPv4 ICMP echo request (type 8).
///
/// Returns `Ok(None)` for any other traffic.
pub fn parse_echo_request(
    linktype: Linktype,
    data: &[u8],
) -> Result<Option<EchoRequest>, FrameError> {
    let Some(sliced) = slice_frame(linktype, data)? else {
        return Ok(None);
    };
    let ip_offset = sliced
        .ether_payload()
        .map_or(0, |ether| data.len() - ether.payload.len());
    let ipv4 = match sliced.net {
        Some(LaxNetSlice::Ipv4(ref ipv4)) => ipv4.header(),
        _ => return Ok(None),
    };
    let icmp = match sliced.transport {
        Some(TransportSlice::Icmpv4(ref icmp)) => icmp,
        _ => return Ok(None),
    };
    if !matches!(icmp.icmp_type(), Icmpv4Type::EchoRequest(_)) {
        return Ok(None);
    }

    Ok(Some(EchoRequest {
        src_ip: ipv4.source_addr(),
        dst_ip: ipv4.destination_addr(),
        identification: ipv4.identification(),
        ttl: ipv4.ttl(),
        icmp_checksum: icmp.checksum(),
        ip_offset,
    }))
}
