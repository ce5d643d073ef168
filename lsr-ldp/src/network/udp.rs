//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use lsr_utils::Sender;
use lsr_utils::ip::Ipv4AddrExt;
use lsr_utils::socket::{UdpSocket, UdpSocketExt};
use tokio::sync::mpsc::error::SendError;

use crate::error::{Error, IoError};
use crate::packet::error::DecodeError;
use crate::packet::{DecodeCxt, PacketInfo, Pdu};
use crate::tasks::messages::input::UdpRxPduMsg;

// All routers on this subnet multicast address.
pub const LDP_MCAST_ADDR_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 2);

// ===== global functions =====

// Creates the discovery socket and joins the LDP multicast group on each of
// the given interface addresses.
pub(crate) fn discovery_socket(
    port: u16,
    interfaces: &[Ipv4Addr],
) -> Result<UdpSocket, IoError> {
    // Create and bind socket.
    let sockaddr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    let socket = UdpSocket::bind_reuseaddr_v4(sockaddr)
        .map_err(IoError::UdpSocket)?;

    // Set socket options.
    socket
        .set_multicast_loop_v4(false)
        .map_err(IoError::UdpSocket)?;
    socket
        .set_multicast_ttl_v4(1)
        .map_err(IoError::UdpSocket)?;

    // Join multicast group.
    for addr in interfaces {
        socket
            .join_multicast_v4(LDP_MCAST_ADDR_V4, *addr)
            .map_err(IoError::UdpMulticastJoin)?;
    }

    Ok(socket)
}

// Sends a PDU to the LDP multicast group out of the given interface.
//
// The caller is expected to serialize concurrent senders, as the outgoing
// interface is a socket-wide setting.
pub(crate) async fn send_packet_multicast(
    socket: &UdpSocket,
    iface_addr: &Ipv4Addr,
    port: u16,
    pdu: &Pdu,
) -> Result<(), std::io::Error> {
    // Encode Hello message.
    let buf = pdu.encode(Pdu::DFLT_MAX_LEN);

    // Send packet.
    socket.set_multicast_if_v4(iface_addr)?;
    socket
        .send_to(&buf, SocketAddrV4::new(LDP_MCAST_ADDR_V4, port))
        .await?;

    Ok(())
}

pub(crate) async fn read_loop(
    socket: Arc<UdpSocket>,
    udp_pdu_rxp: Sender<UdpRxPduMsg>,
) -> Result<(), SendError<UdpRxPduMsg>> {
    let mut buf = [0; Pdu::DFLT_MAX_LEN as usize];

    // PDU header validation closure.
    let validate_pdu_hdr = |_lsr_id, label_space| {
        if label_space != 0 {
            return Err(DecodeError::InvalidLabelSpace(label_space));
        }
        Ok(())
    };

    // Decode context.
    let mut cxt = DecodeCxt {
        pkt_info: PacketInfo {
            // The source address will be overwritten later.
            src_addr: Ipv4Addr::UNSPECIFIED,
            multicast: Some(true),
        },
        pdu_max_len: Pdu::DFLT_MAX_LEN,
        validate_pdu_hdr: Some(Box::new(validate_pdu_hdr)),
    };

    loop {
        // Receive data from the network.
        let (num_bytes, src) = match socket.recv_from(&mut buf).await {
            Ok((num_bytes, src)) => (num_bytes, src),
            Err(error) => {
                IoError::UdpRecv(error).log();
                continue;
            }
        };

        // Validate packet source address.
        let src_addr = match src {
            SocketAddr::V4(src) if src.ip().is_usable() => *src.ip(),
            _ => {
                if let SocketAddr::V4(src) = src {
                    Error::HelloBadSource(*src.ip()).log();
                }
                continue;
            }
        };

        // Decode packet.
        let data = &buf[0..num_bytes];
        cxt.pkt_info.src_addr = src_addr;
        let pdu = Pdu::get_pdu_size(data, &cxt)
            .and_then(|pdu_size| Pdu::decode(&data[0..pdu_size], &cxt));
        let msg = UdpRxPduMsg { src_addr, pdu };
        udp_pdu_rxp.send(msg).await?;
    }
}
