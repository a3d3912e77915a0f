//! Status board rendering.
//!
//! Turns a [`Snapshot`] into the embed shown in the channel. Rendering is pure:
//! the same snapshot and display settings always produce the same payload.

use serenity::all::{CreateEmbed, CreateEmbedFooter};

use crate::common::{ServerInfo, ServerStatus, Snapshot};
use crate::config::types::{ConnectStyle, DisplayConfig, DisplayStyle, ServerOrder};

// Discord embed limits, in characters.
pub const TITLE_LIMIT: usize = 256;
pub const DESCRIPTION_LIMIT: usize = 4096;
pub const FIELD_NAME_LIMIT: usize = 256;
pub const FIELD_VALUE_LIMIT: usize = 1024;
pub const FOOTER_LIMIT: usize = 2048;
pub const FIELD_COUNT_LIMIT: usize = 25;
pub const EMBED_TOTAL_LIMIT: usize = 6000;

/// Discord rejects empty field names and values.
const BLANK: &str = "\u{3164}";

const ONLINE_ICON: &str = ":green_circle:";
const OFFLINE_ICON: &str = ":red_circle:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Everything needed to draw the status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPayload {
    pub title: String,
    pub description: String,
    pub color: Option<u32>,
    pub fields: Vec<PayloadField>,
    pub footer: Option<String>,
}

impl RenderedPayload {
    /// Total characters counted against the embed limit.
    pub fn len(&self) -> usize {
        self.title.chars().count()
            + self.description.chars().count()
            + self.footer.as_deref().map_or(0, |f| f.chars().count())
            + self
                .fields
                .iter()
                .map(|f| f.name.chars().count() + f.value.chars().count())
                .sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title(&self.title)
            .description(&self.description)
            .fields(
                self.fields
                    .iter()
                    .map(|f| (f.name.clone(), f.value.clone(), f.inline)),
            );
        if let Some(color) = self.color {
            embed = embed.colour(color);
        }
        if let Some(ref footer) = self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        embed
    }
}

pub struct Renderer {
    config: DisplayConfig,
}

impl Renderer {
    pub fn new(config: DisplayConfig) -> Self {
        Self { config }
    }

    /// Title used both for rendering and for finding our message in history.
    pub fn title(&self) -> String {
        truncate(&self.config.title, TITLE_LIMIT)
    }

    pub fn render(&self, snapshot: &Snapshot) -> RenderedPayload {
        let visible = self.visible(snapshot);
        let online = visible.iter().filter(|s| s.is_reachable()).count();
        let offline = visible.len() - online;

        let max = self.config.max.min(FIELD_COUNT_LIMIT);
        let mut fields: Vec<PayloadField> = visible
            .iter()
            .take(max)
            .map(|status| self.field(status))
            .collect();

        let mut payload = RenderedPayload {
            title: self.title(),
            description: truncate(&self.description(snapshot, online, offline), DESCRIPTION_LIMIT),
            color: self.config.color,
            fields: Vec::new(),
            footer: None,
        };

        // Drop trailing rows until the whole embed fits.
        let mut hidden = visible.len() - fields.len();
        loop {
            payload.footer = footer(hidden);
            payload.fields = fields.clone();
            if payload.len() <= EMBED_TOTAL_LIMIT || fields.is_empty() {
                break;
            }
            fields.pop();
            hidden += 1;
        }

        payload
    }

    /// The part of `snapshot` the board shows, in configuration order.
    ///
    /// Changes outside it never reach the rendered payload.
    pub fn displayed(&self, snapshot: Snapshot) -> Snapshot {
        if self.config.only.is_empty() {
            return snapshot;
        }
        let servers = snapshot
            .servers
            .into_iter()
            .filter(|s| self.config.only.contains(&s.address))
            .collect();
        Snapshot::new(snapshot.taken_at, servers)
    }

    /// Servers to show, filtered and ordered.
    fn visible<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a ServerStatus> {
        let mut servers: Vec<&ServerStatus> = snapshot
            .servers
            .iter()
            .filter(|s| self.config.only.is_empty() || self.config.only.contains(&s.address))
            .collect();

        // Stable sorts keep configuration order for ties.
        match self.config.order {
            ServerOrder::Config => {}
            ServerOrder::Players => servers.sort_by_key(|s| match s.info() {
                Some(info) => (false, std::cmp::Reverse(self.player_count(info))),
                None => (true, std::cmp::Reverse(0)),
            }),
            ServerOrder::Name => servers.sort_by_key(|s| match s.info() {
                Some(info) => (false, info.name.to_lowercase()),
                None => (true, String::new()),
            }),
        }

        servers
    }

    fn description(&self, snapshot: &Snapshot, online: usize, offline: usize) -> String {
        let mut description = format!("{} server(s) online", online);
        if offline > 0 {
            description.push_str(&format!(", {} offline", offline));
        }
        description.push_str(&format!(
            "\nUpdating every {} seconds\nLast update <t:{}:R>",
            self.config.interval.as_secs(),
            snapshot.taken_at.timestamp()
        ));
        description
    }

    fn field(&self, status: &ServerStatus) -> PayloadField {
        let (name, value) = match (status.info(), self.config.style) {
            (Some(info), DisplayStyle::Compact) => {
                let values = self.placeholders(status, info);
                (
                    substitute(&self.config.upper_format, &values),
                    substitute(&self.config.lower_format, &values),
                )
            }
            (Some(info), DisplayStyle::Detailed) => (
                format!("{} {}", ONLINE_ICON, info.name),
                self.detailed(status, info),
            ),
            (None, _) => (
                format!("{} {}", OFFLINE_ICON, status.address),
                "Offline".to_string(),
            ),
        };

        PayloadField {
            name: non_blank(truncate(&name, FIELD_NAME_LIMIT)),
            value: non_blank(truncate(&value, FIELD_VALUE_LIMIT)),
            inline: false,
        }
    }

    fn detailed(&self, status: &ServerStatus, info: &ServerInfo) -> String {
        let mut lines = vec![
            format!("**Map:** {}", info.map),
            format!(
                "**Players:** {}/{}{}",
                self.player_count(info),
                info.max_players,
                if info.bots > 0 {
                    format!(" ({} bots)", info.bots)
                } else {
                    String::new()
                }
            ),
        ];
        if !info.game.is_empty() {
            lines.push(format!("**Game:** {}", info.game));
        }
        let connect = self.connect(status, info);
        if !connect.is_empty() {
            lines.push(format!("**Connect:** {}", connect));
        }
        if let Some(ref names) = info.player_names {
            if !names.is_empty() {
                lines.push(format!("**Online:** {}", names.join(", ")));
            }
        }
        lines.join("\n")
    }

    fn placeholders(&self, status: &ServerStatus, info: &ServerInfo) -> Vec<(&'static str, String)> {
        vec![
            ("name", info.name.clone()),
            ("address", status.address.to_string()),
            ("map", info.map.clone()),
            ("game", info.game.clone()),
            ("players", self.player_count(info).to_string()),
            ("max_players", info.max_players.to_string()),
            ("bots", info.bots.to_string()),
            ("connect", self.connect(status, info)),
        ]
    }

    fn player_count(&self, info: &ServerInfo) -> u8 {
        if self.config.count_bots {
            info.players
        } else {
            info.humans()
        }
    }

    fn connect(&self, status: &ServerStatus, info: &ServerInfo) -> String {
        let target = status.address.with_port(info.game_port);
        match self.config.connect {
            ConnectStyle::Steam => format!("steam://connect/{}", target),
            ConnectStyle::Website(ref url) => url.replace("%address", &target),
            ConnectStyle::None => String::new(),
        }
    }
}

fn footer(hidden: usize) -> Option<String> {
    if hidden == 0 {
        None
    } else {
        Some(truncate(&format!("+{} more server(s) not shown", hidden), FOOTER_LIMIT))
    }
}

/// Replace `%key` placeholders in one pass. Substituted text is never rescanned,
/// so a server calling itself `%map` stays `%map`.
fn substitute(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let matched = values
            .iter()
            .filter(|(key, _)| tail.starts_with(key))
            .max_by_key(|(key, _)| key.len());
        match matched {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('%');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

// Helpers

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    } else {
        s.to_string()
    }
}

fn non_blank(s: String) -> String {
    if s.trim().is_empty() {
        BLANK.to_string()
    } else {
        s
    }
}
