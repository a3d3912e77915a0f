//! `A2S_INFO` request and replies.

use bytes::{BufMut, Bytes, BytesMut};

use crate::common::error::{ProtocolError, ProtocolResult};
use crate::protocol::packets::{
    edf, read_cstring, read_i16, read_i32, read_u64, read_u8, Packet, PacketDecode,
    PacketEncode, A2S_INFO, INFO_REQUEST_PAYLOAD, S2A_INFO_DETAILED, S2A_INFO_SRC,
    S2C_CHALLENGE, THE_SHIP_APP_ID,
};

/// `A2S_INFO` request, optionally echoing a challenge.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoRequest {
    pub challenge: Option<i32>,
}

impl PacketEncode for InfoRequest {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&Packet::new(A2S_INFO, INFO_REQUEST_PAYLOAD).to_bytes());
        if let Some(challenge) = self.challenge {
            buf.put_i32_le(challenge);
        }
    }
}

/// Challenge issued by the server; must be echoed in the follow-up request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge(pub i32);

impl PacketDecode for Challenge {
    const KIND: u8 = S2C_CHALLENGE;

    fn decode(buf: &mut Bytes) -> ProtocolResult<Self> {
        Ok(Self(read_i32(buf)?))
    }
}

/// Source engine info reply (`I`).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub protocol: u8,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub app_id: i16,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    pub server_type: u8,
    pub environment: u8,
    pub visibility: u8,
    pub vac: u8,
    pub version: String,
    pub game_port: Option<u16>,
    pub steam_id: Option<u64>,
    pub keywords: Option<String>,
    pub game_id: Option<u64>,
}

impl PacketDecode for SourceInfo {
    const KIND: u8 = S2A_INFO_SRC;

    fn decode(buf: &mut Bytes) -> ProtocolResult<Self> {
        let protocol = read_u8(buf)?;
        let name = read_cstring(buf)?;
        let map = read_cstring(buf)?;
        let folder = read_cstring(buf)?;
        let game = read_cstring(buf)?;
        let app_id = read_i16(buf)?;
        let players = read_u8(buf)?;
        let max_players = read_u8(buf)?;
        let bots = read_u8(buf)?;
        let server_type = read_u8(buf)?;
        let environment = read_u8(buf)?;
        let visibility = read_u8(buf)?;
        let vac = read_u8(buf)?;

        if app_id == THE_SHIP_APP_ID {
            // mode, witnesses, duration
            for _ in 0..3 {
                read_u8(buf)?;
            }
        }

        let version = read_cstring(buf)?;

        let mut info = SourceInfo {
            protocol,
            name,
            map,
            folder,
            game,
            app_id,
            players,
            max_players,
            bots,
            server_type,
            environment,
            visibility,
            vac,
            version,
            game_port: None,
            steam_id: None,
            keywords: None,
            game_id: None,
        };

        // Extra data flag is optional; older servers end the reply here.
        if buf.is_empty() {
            return Ok(info);
        }
        let flags = read_u8(buf)?;

        if flags & edf::GAME_PORT != 0 {
            info.game_port = Some(read_i16(buf)? as u16);
        }
        if flags & edf::STEAM_ID != 0 {
            info.steam_id = Some(read_u64(buf)?);
        }
        if flags & edf::SPECTATOR != 0 {
            let _spectator_port = read_i16(buf)?;
            let _spectator_name = read_cstring(buf)?;
        }
        if flags & edf::KEYWORDS != 0 {
            info.keywords = Some(read_cstring(buf)?);
        }
        if flags & edf::GAME_ID != 0 {
            info.game_id = Some(read_u64(buf)?);
        }

        Ok(info)
    }
}

/// Obsolete GoldSource info reply (`m`), still sent by some HLDS servers.
#[derive(Debug, Clone, PartialEq)]
pub struct GoldSrcInfo {
    pub address: String,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub players: u8,
    pub max_players: u8,
    pub protocol: u8,
    pub server_type: u8,
    pub environment: u8,
    pub visibility: u8,
    pub vac: u8,
    pub bots: u8,
}

impl PacketDecode for GoldSrcInfo {
    const KIND: u8 = S2A_INFO_DETAILED;

    fn decode(buf: &mut Bytes) -> ProtocolResult<Self> {
        let address = read_cstring(buf)?;
        let name = read_cstring(buf)?;
        let map = read_cstring(buf)?;
        let folder = read_cstring(buf)?;
        let game = read_cstring(buf)?;
        let players = read_u8(buf)?;
        let max_players = read_u8(buf)?;
        let protocol = read_u8(buf)?;
        let server_type = read_u8(buf)?;
        let environment = read_u8(buf)?;
        let visibility = read_u8(buf)?;
        let is_mod = read_u8(buf)?;

        if is_mod == 1 {
            let _link = read_cstring(buf)?;
            let _download_link = read_cstring(buf)?;
            let _null = read_u8(buf)?;
            let _version = read_i32(buf)?;
            let _size = read_i32(buf)?;
            let _mod_type = read_u8(buf)?;
            let _dll = read_u8(buf)?;
        }

        let vac = read_u8(buf)?;
        let bots = read_u8(buf)?;

        Ok(GoldSrcInfo {
            address,
            name,
            map,
            folder,
            game,
            players,
            max_players,
            protocol,
            server_type,
            environment,
            visibility,
            vac,
            bots,
        })
    }
}

impl GoldSrcInfo {
    /// Game port announced in the `address` field, if it parses.
    pub fn game_port(&self) -> Option<u16> {
        self.address.rsplit_once(':')?.1.parse().ok()
    }
}

/// Any reply an `A2S_INFO` request can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoReply {
    Challenge(Challenge),
    Source(SourceInfo),
    GoldSrc(GoldSrcInfo),
}

impl InfoReply {
    pub fn from_packet(packet: Packet) -> ProtocolResult<Self> {
        match packet.kind {
            S2C_CHALLENGE => Challenge::from_packet(packet).map(Self::Challenge),
            S2A_INFO_SRC => SourceInfo::from_packet(packet).map(Self::Source),
            S2A_INFO_DETAILED => GoldSrcInfo::from_packet(packet).map(Self::GoldSrc),
            actual => Err(ProtocolError::UnexpectedResponse {
                expected: S2A_INFO_SRC,
                actual,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a Source info reply datagram as a server would send it.
    pub(crate) fn source_info_datagram(
        name: &str,
        map: &str,
        players: u8,
        max_players: u8,
        bots: u8,
        game_port: Option<u16>,
    ) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_i32_le(-1);
        buf.put_u8(S2A_INFO_SRC);
        buf.put_u8(17);
        for s in [name, map, "cstrike", "Counter-Strike: Source"] {
            buf.put_slice(s.as_bytes());
            buf.put_u8(0);
        }
        buf.put_i16_le(240);
        buf.put_u8(players);
        buf.put_u8(max_players);
        buf.put_u8(bots);
        buf.put_u8(b'd');
        buf.put_u8(b'l');
        buf.put_u8(0);
        buf.put_u8(1);
        buf.put_slice(b"1.0.0.0\0");
        if let Some(port) = game_port {
            buf.put_u8(edf::GAME_PORT | edf::KEYWORDS);
            buf.put_i16_le(port as i16);
            buf.put_slice(b"alltalk,increased_maxplayers\0");
        }
        buf.freeze()
    }

    #[test]
    fn test_info_request_encoding() {
        let mut buf = BytesMut::new();
        InfoRequest::default().encode(&mut buf);
        assert_eq!(&buf[..], b"\xFF\xFF\xFF\xFFTSource Engine Query\0");

        let mut buf = BytesMut::new();
        InfoRequest {
            challenge: Some(0x0403_0201),
        }
        .encode(&mut buf);
        assert_eq!(&buf[buf.len() - 4..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_decode_source_info() {
        let packet = Packet::parse(source_info_datagram("My Server", "de_dust2", 5, 32, 1, None)).unwrap();
        let reply = InfoReply::from_packet(packet).unwrap();
        let InfoReply::Source(info) = reply else {
            panic!("expected source info");
        };
        assert_eq!(info.name, "My Server");
        assert_eq!(info.map, "de_dust2");
        assert_eq!(info.folder, "cstrike");
        assert_eq!(info.players, 5);
        assert_eq!(info.max_players, 32);
        assert_eq!(info.bots, 1);
        assert_eq!(info.version, "1.0.0.0");
        assert_eq!(info.game_port, None);
    }

    #[test]
    fn test_decode_source_info_extra_data() {
        let packet = Packet::parse(source_info_datagram("S", "cp_badlands", 0, 24, 0, Some(27016))).unwrap();
        let info = SourceInfo::from_packet(packet).unwrap();
        assert_eq!(info.game_port, Some(27016));
        assert_eq!(info.keywords.as_deref(), Some("alltalk,increased_maxplayers"));
    }

    #[test]
    fn test_decode_truncated_source_info() {
        let full = source_info_datagram("My Server", "de_dust2", 5, 32, 1, None);
        let packet = Packet::parse(full.slice(..full.len() - 12)).unwrap();
        assert!(SourceInfo::from_packet(packet).is_err());
    }

    #[test]
    fn test_decode_challenge() {
        let packet = Packet::parse(Bytes::from_static(b"\xFF\xFF\xFF\xFFA\x11\x22\x33\x44")).unwrap();
        assert_eq!(
            InfoReply::from_packet(packet).unwrap(),
            InfoReply::Challenge(Challenge(0x4433_2211))
        );
    }

    #[test]
    fn test_decode_goldsrc_info() {
        let mut buf = BytesMut::new();
        for s in ["192.0.2.1:27015", "HLDS", "crossfire", "valve", "Half-Life"] {
            buf.put_slice(s.as_bytes());
            buf.put_u8(0);
        }
        buf.put_slice(&[3, 16, 47, b'd', b'l', 0, 0, 1, 2]);
        let packet = Packet::new(S2A_INFO_DETAILED, buf.freeze());

        let InfoReply::GoldSrc(info) = InfoReply::from_packet(packet).unwrap() else {
            panic!("expected goldsrc info");
        };
        assert_eq!(info.name, "HLDS");
        assert_eq!(info.players, 3);
        assert_eq!(info.max_players, 16);
        assert_eq!(info.bots, 2);
        assert_eq!(info.game_port(), Some(27015));
    }

    #[test]
    fn test_unexpected_reply_type() {
        let packet = Packet::new(b'Z', Bytes::new());
        assert!(matches!(
            InfoReply::from_packet(packet),
            Err(ProtocolError::UnexpectedResponse { actual: b'Z', .. })
        ));
    }
}
