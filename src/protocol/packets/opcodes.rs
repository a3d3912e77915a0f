//! A2S request and response type bytes.

// ============================================================================
// Requests (client -> server)
// ============================================================================

/// Server information request (`T`).
pub const A2S_INFO: u8 = 0x54;
/// Player list request (`U`).
pub const A2S_PLAYER: u8 = 0x55;

/// Payload every `A2S_INFO` request starts with.
pub const INFO_REQUEST_PAYLOAD: &[u8] = b"Source Engine Query\0";

/// Challenge value that asks the server to issue a real one.
pub const NO_CHALLENGE: i32 = -1;

// ============================================================================
// Responses (server -> client)
// ============================================================================

/// Challenge issued instead of the requested data (`A`).
pub const S2C_CHALLENGE: u8 = 0x41;
/// Source engine server information (`I`).
pub const S2A_INFO_SRC: u8 = 0x49;
/// Obsolete GoldSource server information (`m`).
pub const S2A_INFO_DETAILED: u8 = 0x6D;
/// Player list (`D`).
pub const S2A_PLAYER: u8 = 0x44;

// ============================================================================
// Info reply extra data flags
// ============================================================================

pub mod edf {
    pub const GAME_PORT: u8 = 0x80;
    pub const STEAM_ID: u8 = 0x10;
    pub const SPECTATOR: u8 = 0x40;
    pub const KEYWORDS: u8 = 0x20;
    pub const GAME_ID: u8 = 0x01;
}

/// App id of The Ship, whose info reply carries three extra bytes.
pub const THE_SHIP_APP_ID: i16 = 2400;
