//! `A2S_PLAYER` request and reply.

use bytes::{BufMut, Bytes, BytesMut};

use crate::common::error::{ProtocolError, ProtocolResult};
use crate::protocol::info::Challenge;
use crate::protocol::packets::{
    read_cstring, read_f32, read_i32, read_u8, Packet, PacketDecode, PacketEncode, A2S_PLAYER,
    NO_CHALLENGE, S2A_PLAYER, S2C_CHALLENGE,
};

/// `A2S_PLAYER` request. Always carries a challenge; `-1` asks for one.
#[derive(Debug, Clone, Copy)]
pub struct PlayerRequest {
    pub challenge: i32,
}

impl Default for PlayerRequest {
    fn default() -> Self {
        Self {
            challenge: NO_CHALLENGE,
        }
    }
}

impl PacketEncode for PlayerRequest {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&Packet::new(A2S_PLAYER, Bytes::new()).to_bytes());
        buf.put_i32_le(self.challenge);
    }
}

/// One entry of the player list.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntry {
    pub index: u8,
    pub name: String,
    pub score: i32,
    /// Seconds connected.
    pub duration: f32,
}

/// Player list reply (`D`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerList {
    pub players: Vec<PlayerEntry>,
}

impl PlayerList {
    /// Names of connected players, skipping the empty names of players still connecting.
    pub fn names(&self) -> Vec<String> {
        self.players
            .iter()
            .filter(|p| !p.name.is_empty())
            .map(|p| p.name.clone())
            .collect()
    }
}

impl PacketDecode for PlayerList {
    const KIND: u8 = S2A_PLAYER;

    fn decode(buf: &mut Bytes) -> ProtocolResult<Self> {
        let count = read_u8(buf)?;
        let mut players = Vec::with_capacity(count as usize);

        for _ in 0..count {
            // Some servers announce more players than they list.
            if buf.is_empty() {
                break;
            }
            let index = read_u8(buf)?;
            let name = read_cstring(buf)?;
            let score = read_i32(buf)?;
            let duration = read_f32(buf)?;
            players.push(PlayerEntry {
                index,
                name,
                score,
                duration,
            });
        }

        Ok(Self { players })
    }
}

/// Any reply an `A2S_PLAYER` request can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerReply {
    Challenge(Challenge),
    Players(PlayerList),
}

impl PlayerReply {
    pub fn from_packet(packet: Packet) -> ProtocolResult<Self> {
        match packet.kind {
            S2C_CHALLENGE => Challenge::from_packet(packet).map(Self::Challenge),
            S2A_PLAYER => PlayerList::from_packet(packet).map(Self::Players),
            actual => Err(ProtocolError::UnexpectedResponse {
                expected: S2A_PLAYER,
                actual,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn player_list_datagram(names: &[&str]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_i32_le(-1);
        buf.put_u8(S2A_PLAYER);
        buf.put_u8(names.len() as u8);
        for (i, name) in names.iter().enumerate() {
            buf.put_u8(i as u8);
            buf.put_slice(name.as_bytes());
            buf.put_u8(0);
            buf.put_i32_le(10 * i as i32);
            buf.put_f32_le(60.5);
        }
        buf.freeze()
    }

    #[test]
    fn test_player_request_encoding() {
        let mut buf = BytesMut::new();
        PlayerRequest::default().encode(&mut buf);
        assert_eq!(&buf[..], b"\xFF\xFF\xFF\xFFU\xFF\xFF\xFF\xFF");

        let mut buf = BytesMut::new();
        PlayerRequest { challenge: 0x0403_0201 }.encode(&mut buf);
        assert_eq!(&buf[..], b"\xFF\xFF\xFF\xFFU\x01\x02\x03\x04");
    }

    #[test]
    fn test_decode_player_list() {
        let packet = Packet::parse(player_list_datagram(&["alice", "", "bob"])).unwrap();
        let PlayerReply::Players(list) = PlayerReply::from_packet(packet).unwrap() else {
            panic!("expected player list");
        };
        assert_eq!(list.players.len(), 3);
        assert_eq!(list.players[2].score, 20);
        assert_eq!(list.names(), vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn test_decode_player_list_short_count() {
        let mut data = BytesMut::from(&player_list_datagram(&["alice"])[..]);
        data[5] = 4;
        let list = PlayerList::from_packet(Packet::parse(data.freeze()).unwrap()).unwrap();
        assert_eq!(list.players.len(), 1);
    }

    #[test]
    fn test_decode_player_list_truncated_entry() {
        let full = player_list_datagram(&["alice"]);
        let packet = Packet::parse(full.slice(..full.len() - 2)).unwrap();
        assert!(PlayerList::from_packet(packet).is_err());
    }
}
