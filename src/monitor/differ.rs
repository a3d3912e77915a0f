//! Snapshot comparison.
//!
//! Decides whether the board needs re-rendering. Only displayed fields count:
//! timestamps, latency and the detail of a failure never trigger an edit.

use std::fmt;

use crate::common::{ServerAddress, ServerInfo, ServerState, Snapshot};

/// One displayed difference between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Nothing was published yet.
    Initial,
    /// The set or order of servers differs.
    ServerList,
    WentOnline(ServerAddress),
    WentOffline(ServerAddress),
    Renamed {
        address: ServerAddress,
        from: String,
        to: String,
    },
    MapChanged {
        address: ServerAddress,
        from: String,
        to: String,
    },
    Players {
        address: ServerAddress,
        from: (u8, u8, u8),
        to: (u8, u8, u8),
    },
    PlayerNames(ServerAddress),
    Game {
        address: ServerAddress,
        from: String,
        to: String,
    },
    GamePort {
        address: ServerAddress,
        from: u16,
        to: u16,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("first snapshot"),
            Self::ServerList => f.write_str("server list changed"),
            Self::WentOnline(address) => write!(f, "{} came online", address),
            Self::WentOffline(address) => write!(f, "{} went offline", address),
            Self::Renamed { address, from, to } => {
                write!(f, "{} renamed '{}' -> '{}'", address, from, to)
            }
            Self::MapChanged { address, from, to } => {
                write!(f, "{} map {} -> {}", address, from, to)
            }
            Self::Players { address, from, to } => write!(
                f,
                "{} players {}/{} ({} bots) -> {}/{} ({} bots)",
                address, from.0, from.1, from.2, to.0, to.1, to.2
            ),
            Self::PlayerNames(address) => write!(f, "{} player list changed", address),
            Self::Game { address, from, to } => {
                write!(f, "{} game '{}' -> '{}'", address, from, to)
            }
            Self::GamePort { address, from, to } => {
                write!(f, "{} game port {} -> {}", address, from, to)
            }
        }
    }
}

/// Everything that changed between two snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDiff {
    pub changes: Vec<Change>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        if self.changes.is_empty() {
            return "no changes".to_string();
        }
        self.changes
            .iter()
            .map(Change::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Returns true if `current` would render differently from `previous`.
pub fn has_changed(previous: Option<&Snapshot>, current: &Snapshot) -> bool {
    !diff(previous, current).is_empty()
}

/// Field-wise comparison of two snapshots, server by server in order.
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> SnapshotDiff {
    let previous = match previous {
        Some(previous) => previous,
        None => {
            return SnapshotDiff {
                changes: vec![Change::Initial],
            }
        }
    };

    let same_servers = previous.servers.len() == current.servers.len()
        && previous
            .servers
            .iter()
            .zip(&current.servers)
            .all(|(a, b)| a.address == b.address);
    if !same_servers {
        return SnapshotDiff {
            changes: vec![Change::ServerList],
        };
    }

    let mut changes = Vec::new();
    for (old, new) in previous.servers.iter().zip(&current.servers) {
        let address = &new.address;
        match (&old.state, &new.state) {
            (ServerState::Offline(_), ServerState::Offline(_)) => {}
            (ServerState::Online(_), ServerState::Offline(_)) => {
                changes.push(Change::WentOffline(address.clone()));
            }
            (ServerState::Offline(_), ServerState::Online(_)) => {
                changes.push(Change::WentOnline(address.clone()));
            }
            (ServerState::Online(old), ServerState::Online(new)) => {
                diff_info(address, old, new, &mut changes);
            }
        }
    }

    SnapshotDiff { changes }
}

fn diff_info(address: &ServerAddress, old: &ServerInfo, new: &ServerInfo, changes: &mut Vec<Change>) {
    if old.name != new.name {
        changes.push(Change::Renamed {
            address: address.clone(),
            from: old.name.clone(),
            to: new.name.clone(),
        });
    }
    if old.map != new.map {
        changes.push(Change::MapChanged {
            address: address.clone(),
            from: old.map.clone(),
            to: new.map.clone(),
        });
    }
    let old_counts = (old.players, old.max_players, old.bots);
    let new_counts = (new.players, new.max_players, new.bots);
    if old_counts != new_counts {
        changes.push(Change::Players {
            address: address.clone(),
            from: old_counts,
            to: new_counts,
        });
    }
    if old.player_names != new.player_names {
        changes.push(Change::PlayerNames(address.clone()));
    }
    if old.game != new.game {
        changes.push(Change::Game {
            address: address.clone(),
            from: old.game.clone(),
            to: new.game.clone(),
        });
    }
    if old.game_port != new.game_port {
        changes.push(Change::GamePort {
            address: address.clone(),
            from: old.game_port,
            to: new.game_port,
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use crate::common::{FailureReason, ServerStatus};

    pub(crate) fn info(name: &str, map: &str, players: u8, max_players: u8) -> ServerInfo {
        ServerInfo {
            name: name.to_string(),
            map: map.to_string(),
            folder: "cstrike".to_string(),
            game: "Counter-Strike: Source".to_string(),
            players,
            max_players,
            bots: 0,
            game_port: 27015,
            latency: Duration::from_millis(30),
            player_names: None,
        }
    }

    fn snapshot(secs: i64, servers: Vec<ServerStatus>) -> Snapshot {
        Snapshot::new(Utc.timestamp_opt(secs, 0).unwrap(), servers)
    }

    fn addr(n: u8) -> ServerAddress {
        ServerAddress::new(format!("10.0.0.{}", n), 27015)
    }

    fn base() -> Vec<ServerStatus> {
        vec![
            ServerStatus::online(addr(1), info("Alpha", "de_dust2", 5, 32)),
            ServerStatus::offline(addr(2), FailureReason::Timeout),
        ]
    }

    #[test]
    fn test_first_snapshot_is_changed() {
        let current = snapshot(0, base());
        assert!(has_changed(None, &current));
        assert_eq!(diff(None, &current).changes, vec![Change::Initial]);
    }

    #[test]
    fn test_identical_snapshots_unchanged() {
        let a = snapshot(0, base());
        let b = snapshot(0, base());
        assert!(!has_changed(Some(&a), &b));
    }

    #[test]
    fn test_timestamp_latency_and_reason_ignored() {
        let a = snapshot(0, base());
        let mut servers = base();
        servers[0].queried_at = Utc.timestamp_opt(500, 0).unwrap();
        if let ServerState::Online(ref mut info) = servers[0].state {
            info.latency = Duration::from_millis(250);
        }
        servers[1].state = ServerState::Offline(FailureReason::Network("refused".to_string()));
        let b = snapshot(60, servers);

        assert!(!has_changed(Some(&a), &b));
    }

    #[test]
    fn test_each_displayed_field_detected() {
        let a = snapshot(0, base());

        let edits: [fn(&mut ServerInfo); 8] = [
            |i| i.name = "Beta".to_string(),
            |i| i.map = "de_nuke".to_string(),
            |i| i.players = 6,
            |i| i.max_players = 24,
            |i| i.bots = 2,
            |i| i.player_names = Some(vec!["alice".to_string()]),
            |i| i.game = "Counter-Strike: Global Offensive".to_string(),
            |i| i.game_port = 27016,
        ];

        for edit in edits {
            let mut servers = base();
            if let ServerState::Online(ref mut info) = servers[0].state {
                edit(info);
            }
            let b = snapshot(0, servers);
            let d = diff(Some(&a), &b);
            assert_eq!(d.changes.len(), 1, "{}", d.summary());
        }
    }

    #[test]
    fn test_game_change_detected() {
        let a = snapshot(0, base());
        let mut servers = base();
        if let ServerState::Online(ref mut info) = servers[0].state {
            info.game = "Team Fortress".to_string();
        }
        let b = snapshot(0, servers);

        assert!(has_changed(Some(&a), &b));
        assert_eq!(
            diff(Some(&a), &b).summary(),
            "10.0.0.1:27015 game 'Counter-Strike: Source' -> 'Team Fortress'"
        );
    }

    #[test]
    fn test_reachability_change_detected() {
        let a = snapshot(0, base());

        let mut servers = base();
        servers[0].state = ServerState::Offline(FailureReason::Timeout);
        servers[1].state = ServerState::Online(info("Bravo", "cs_office", 0, 16));
        let b = snapshot(0, servers);

        assert_eq!(
            diff(Some(&a), &b).changes,
            vec![Change::WentOffline(addr(1)), Change::WentOnline(addr(2))]
        );
    }

    #[test]
    fn test_server_list_change_detected() {
        let a = snapshot(0, base());
        let mut servers = base();
        servers.reverse();
        let b = snapshot(0, servers);

        assert_eq!(diff(Some(&a), &b).changes, vec![Change::ServerList]);
    }

    #[test]
    fn test_summary() {
        let a = snapshot(0, base());
        let mut servers = base();
        if let ServerState::Online(ref mut info) = servers[0].state {
            info.players = 7;
        }
        let b = snapshot(0, servers);

        assert_eq!(
            diff(Some(&a), &b).summary(),
            "10.0.0.1:27015 players 5/32 (0 bots) -> 7/32 (0 bots)"
        );
        assert_eq!(SnapshotDiff::default().summary(), "no changes");
    }
}
