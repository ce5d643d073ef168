//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use lsr_utils::socket::{
    OwnedReadHalf, OwnedWriteHalf, TcpConnInfo, TcpListener, TcpSocket,
    TcpSocketExt, TcpStream, TcpStreamExt,
};
use lsr_utils::{Sender, UnboundedSender};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc::error::SendError;

use crate::error::{Error, IoError};
use crate::packet::error::DecodeError;
use crate::packet::{DecodeCxt, PacketInfo, Pdu};
use crate::tasks::messages::SessionMsg;
use crate::tasks::messages::input::TcpAcceptMsg;

const LISTEN_BACKLOG: u32 = 1024;

// ===== global functions =====

pub(crate) fn listen_socket(
    addr: Ipv4Addr,
    port: u16,
) -> Result<TcpListener, std::io::Error> {
    // Create and bind socket.
    let socket = TcpSocket::new_v4_reuseaddr()?;
    socket.bind(SocketAddr::V4(SocketAddrV4::new(addr, port)))?;

    socket.listen(LISTEN_BACKLOG)
}

pub(crate) async fn listen_loop(
    listener: Arc<TcpListener>,
    tcp_acceptp: Sender<TcpAcceptMsg>,
) -> Result<(), SendError<TcpAcceptMsg>> {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => match stream.conn_info() {
                Ok(conn_info) => {
                    let msg = TcpAcceptMsg { stream, conn_info };
                    tcp_acceptp.send(msg).await?;
                }
                Err(error) => {
                    IoError::TcpConnInfo(error).log();
                }
            },
            Err(error) => {
                IoError::TcpAccept(error).log();
            }
        }
    }
}

fn connect_socket(local_addr: Ipv4Addr) -> Result<TcpSocket, std::io::Error> {
    let socket = TcpSocket::new_v4_reuseaddr()?;
    socket.bind(SocketAddr::V4(SocketAddrV4::new(local_addr, 0)))?;
    Ok(socket)
}

// Opens a session connection to a peer, giving up once `timeout` elapses.
pub(crate) async fn connect(
    lsr_id: Ipv4Addr,
    local_addr: Ipv4Addr,
    remote_addr: Ipv4Addr,
    port: u16,
    timeout: Duration,
) -> Result<(TcpStream, TcpConnInfo), Error> {
    // Create TCP socket.
    let socket = connect_socket(local_addr)
        .map_err(|error| Error::Connect(lsr_id, error))?;

    // Connect to remote address on the LDP port.
    let sockaddr = SocketAddr::V4(SocketAddrV4::new(remote_addr, port));
    let stream = tokio::time::timeout(timeout, socket.connect(sockaddr))
        .await
        .map_err(|_| Error::ConnectTimeout(lsr_id))?
        .map_err(|error| Error::Connect(lsr_id, error))?;

    // Obtain TCP connection address/port information.
    let conn_info = stream.conn_info().map_err(IoError::TcpConnInfo)?;

    Ok((stream, conn_info))
}

pub(crate) async fn send_pdu(
    stream: &mut OwnedWriteHalf,
    pdu: &Pdu,
    max_pdu_len: u16,
) -> Result<(), std::io::Error> {
    let buf = pdu.encode(max_pdu_len);
    stream.write_all(&buf).await
}

// Reads the session byte stream, framing it into PDUs.
//
// Returns once the connection is closed or an undecodable PDU is received.
pub(crate) async fn read_loop(
    mut stream: OwnedReadHalf,
    nbr_lsr_id: Ipv4Addr,
    nbr_raddr: Ipv4Addr,
    session_msgp: UnboundedSender<SessionMsg>,
) -> Result<(), SendError<SessionMsg>> {
    let mut buf = vec![0; Pdu::MAX_SIZE];
    let mut data = Vec::with_capacity(Pdu::MAX_SIZE);

    // PDU header validation closure.
    let validate_pdu_hdr = move |lsr_id, label_space| {
        if lsr_id != nbr_lsr_id {
            return Err(DecodeError::InvalidLsrId(lsr_id));
        }
        if label_space != 0 {
            return Err(DecodeError::InvalidLabelSpace(label_space));
        }
        Ok(())
    };

    // Decode context.
    let cxt = DecodeCxt {
        pkt_info: PacketInfo {
            src_addr: nbr_raddr,
            multicast: None,
        },
        pdu_max_len: Pdu::DFLT_MAX_LEN,
        validate_pdu_hdr: Some(Box::new(validate_pdu_hdr)),
    };

    loop {
        // Read data from the network.
        match stream.read(&mut buf).await {
            Ok(0) => {
                // Notify that the connection was closed by the remote end.
                let msg = SessionMsg::RxPdu(Err(Error::PeerClosed(
                    nbr_lsr_id,
                )));
                session_msgp.send(msg)?;
                return Ok(());
            }
            Ok(num_bytes) => data.extend_from_slice(&buf[0..num_bytes]),
            Err(error) => {
                IoError::TcpRecv(error).log();
                let msg = SessionMsg::RxPdu(Err(Error::PeerClosed(
                    nbr_lsr_id,
                )));
                session_msgp.send(msg)?;
                return Ok(());
            }
        };

        // Decode PDU(s).
        loop {
            let pdu = match Pdu::get_pdu_size(&data, &cxt) {
                Ok(pdu_size) => {
                    let pdu = Pdu::decode(&data[0..pdu_size], &cxt);
                    data.drain(0..pdu_size);
                    pdu
                }
                // Wait for more data.
                Err(DecodeError::IncompletePdu) => break,
                Err(error) => Err(error),
            };

            // Notify that the PDU was received. The byte stream can't be
            // resynchronized after a decode error.
            let failed = pdu.is_err();
            let pdu = pdu.map_err(|error| Error::PeerDecode(nbr_lsr_id, error));
            session_msgp.send(SessionMsg::RxPdu(pdu))?;
            if failed {
                return Ok(());
            }
        }
    }
}
