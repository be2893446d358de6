//! Report composition.
//!
//! Turns the statistics engine into the HTML status document served by the
//! web surface and the compact ARC digest emitted over the mesh. The HTML
//! document is a static template expanded by [`template::render`] against a
//! resolver backed by a [`StatsSnapshot`] and the device identity.

pub mod template;

use chrono::{Local, TimeZone};

use crate::config::{Config, NodeRole};
use crate::stats::arc::Digest;
use crate::stats::{self, PeerId, SharedStats, StatsSnapshot};

/// Row bases of the peer table: two low ranges, then the repeater decades.
const TABLE_ROW_BASES: [PeerId; 12] =
    [0, 20, 100, 110, 120, 130, 140, 150, 160, 170, 180, 190];

const REPEATER_TEMPLATE: &str = r#"<!DOCTYPE HTML><html>
<head>
  <title>%TITLE%</title>
  <style>
    body { background-color: #cccccc; font-family: Arial, Helvetica, Sans-Serif; Color: #000088; line-height: 1.05; }
    table { border-collapse: collapse; }
    td { text-align: right; border: 1px solid #777777; padding: 4px; }
    button { margin: 5px; padding:10px; min-height:20px; min-width: 80px; float:left; }
    .mph { color: #606060; font-size:smaller; }
    .arc { color: #006000; font-size:smaller; }
  </style>
</head>
<body>
  <h2>%TITLE%</h2>
  <p>
    IP:<b>%IPADDR%</b>&ensp;
    Name:<b>%HOSTNAME%</b>&ensp;
    Node:<b>%NODEID%</b>&ensp;
    Parent:<b>%PARENT%</b>&ensp;
    Power:<b>%POWER%</b>
  </p>
  <p>
    ARC <b>%SUCCESS%</b>%% success,&ensp;<b>%PACKETS%</b> packets,&ensp;<b>%RETRIES%</b> retries.&emsp;
  </p>
  <p>
    Node: rx:<b>%NRX%</b>&emsp;tx:<b>%NTX%</b>&emsp;err:<b>%NERR%</b>&emsp;
    Since: %LASTCLEAR% (%ELAPSED%s)&emsp;Time: %NOW%
  </p>
  <p>%TABLE%</p>
  <p>
   <form action="/clear"><button type="submit">Clear</button></form>
   <form action="/reboot"><button type="submit">Restart</button></form>
  </p>
</body>
</html>
"#;

const GATEWAY_TEMPLATE: &str = r#"<!DOCTYPE HTML><html>
<head>
  <title>%TITLE%</title>
  <style>
    body { background-color: #cccccc; font-family: Arial, Helvetica, Sans-Serif; Color: #000088; }
    table { border-collapse: collapse; }
    td { text-align: right; border: 1px solid #777777; padding: 4px; }
    button { margin: 5px; padding:10px; min-height:20px; min-width: 80px; float:left; }
    .mph { color: #606060; font-size:smaller; }
    .arc { color: #006000; font-size:smaller; }
  </style>
</head>
<body>
  <h2>%TITLE%</h2>
  <p>IP:<b>%IPADDR%</b>&emsp;Name:<b>%HOSTNAME%</b></p>
  <p>
    Node: rx:<b>%NRX%</b>&emsp;tx:<b>%NTX%</b>&emsp;err:<b>%NERR%</b><br/>
    Gateway: rx:<b>%NGWRX%</b>&emsp;tx:<b>%NGWTX%</b>
  </p>
  <p>%TABLE%</p>
  <form action="/clear"><button type="submit">Clear</button></form>
  <form action="/reboot"><button type="submit">Restart</button></form>
  <p>Since: %LASTCLEAR% (%ELAPSED%s)&emsp;%NOW%</p>
</body>
</html>
"#;

/// Identity fields sourced from the network boundary and configuration.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub hostname: String,
    pub ip: String,
    pub node_id: PeerId,
    pub parent_id: PeerId,
    pub power_level: String,
    pub role: NodeRole,
    pub title: String,
    pub version: String,
}

impl DeviceIdentity {
    pub fn from_config(config: &Config) -> Self {
        let title = match config.node.role {
            NodeRole::Repeater => "Meshstat Repeater".to_string(),
            NodeRole::Gateway => "Meshstat Gateway".to_string(),
        };
        Self {
            hostname: config.node.hostname.clone(),
            ip: config.node.ip.clone(),
            node_id: config.node.node_id,
            parent_id: config.node.parent_id,
            power_level: config.node.power_level.clone(),
            role: config.node.role,
            title,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Assembles the peer table, aggregate panel, and surrounding document.
#[derive(Clone)]
pub struct ReportComposer {
    identity: DeviceIdentity,
    stats: SharedStats,
}

impl ReportComposer {
    pub fn new(identity: DeviceIdentity, stats: SharedStats) -> Self {
        Self { identity, stats }
    }

    /// Render the full HTML status document for the node's role.
    pub fn render_report(&self) -> String {
        let snapshot = stats::lock(&self.stats).snapshot();
        let document = match self.identity.role {
            NodeRole::Repeater => REPEATER_TEMPLATE,
            NodeRole::Gateway => GATEWAY_TEMPLATE,
        };
        template::render(document, |key| self.resolve(key, &snapshot))
    }

    /// Compact ARC digest payload for the out-of-band report.
    pub fn digest(&self) -> String {
        Digest::from(stats::lock(&self.stats).arc_aggregate()).to_string()
    }

    fn resolve(&self, key: &str, snap: &StatsSnapshot) -> String {
        match key {
            // static device information
            "IPADDR" => self.identity.ip.clone(),
            "HOSTNAME" => self.identity.hostname.clone(),
            "NODEID" => self.identity.node_id.to_string(),
            "PARENT" => self.identity.parent_id.to_string(),
            "VERSION" => self.identity.version.clone(),
            "POWER" => self.identity.power_level.clone(),
            "TITLE" => self.identity.title.clone(),
            // link counters
            "NRX" => snap.link.received.to_string(),
            "NTX" => snap.link.sent.to_string(),
            "NGWRX" => snap.link.forwarded_received.to_string(),
            "NGWTX" => snap.link.forwarded_sent.to_string(),
            "NERR" => snap.link.errors.to_string(),
            // ARC aggregate
            "PACKETS" => snap.arc.packets.to_string(),
            "RETRIES" => snap.arc.retries.to_string(),
            "SUCCESS" => snap.arc.success_rate.to_string(),
            // timestamps
            "NOW" => format_epoch(snap.now_epoch),
            "LASTCLEAR" => format_epoch(snap.last_reset_epoch),
            "ELAPSED" => snap.elapsed_secs.to_string(),
            // the biggie: table of messages vs peer id
            "TABLE" => peer_table(snap),
            _ => String::new(),
        }
    }
}

/// Local date-time rendering of an epoch, `25.12.2024 18:30:00` style.
fn format_epoch(epoch: i64) -> String {
    match Local.timestamp_opt(epoch, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%d.%m.%Y %H:%M:%S").to_string(),
        _ => epoch.to_string(),
    }
}

/// Generate the HTML table of per-peer traffic, 10 ids per row.
fn peer_table(snap: &StatsSnapshot) -> String {
    let mut s = String::from("<table><tr><th> </th>");
    for x in 0..10 {
        s.push_str(&format!("<th>&ensp;+{x}</th>"));
    }
    s.push_str("</tr>\n");
    for base in TABLE_ROW_BASES {
        s.push_str(&table_row(base, snap));
    }
    s.push_str("</table>");
    s
}

/// One table row covering peer ids `base`..`base+9`.
fn table_row(base: PeerId, snap: &StatsSnapshot) -> String {
    let mut s = format!("<tr><th>{base}:</th>");
    for x in 0..10 {
        let entry = snap.peer(base + x);
        s.push_str("<td>");
        if entry.received > 0 {
            s.push_str(&format!("<b>{}</b>", entry.received));
            if snap.elapsed_secs > 0 {
                let per_hour = entry.received as u64 * 3600 / snap.elapsed_secs;
                s.push_str(&format!("&ensp;<span class='mph'>{per_hour}/h</span>"));
            }
        }
        if let Some(rate) = entry.success_rate() {
            s.push_str(&format!("<br/><span class='arc'>{rate}%</span>"));
        }
        s.push_str("</td>");
    }
    s.push_str("</tr>\n");
    s
}
