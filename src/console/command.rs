// Console commands
//
// A line is either a slash command or message text. Commands that only make
// sense for the anti-entropy variant are not recognized on a rumor node, so
// there they become message text like any other unknown slash command.

use crate::node::Variant;

/// One parsed console line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    AddPeer(String),
    RemovePeer(String),
    ListPeers,
    ListMessages,
    DeleteMessage(String),
    Help,
    Originate(String),
    Empty,
}

impl Command {
    /// Parse a console line for a node of the given variant
    pub fn parse(line: &str, variant: Variant) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        if let Some(peer) = line.strip_prefix("/add ") {
            return Self::AddPeer(peer.trim().to_string());
        }
        if let Some(peer) = line.strip_prefix("/remove ") {
            return Self::RemovePeer(peer.trim().to_string());
        }
        match line {
            "/peers" => return Self::ListPeers,
            "/help" => return Self::Help,
            _ => {}
        }

        if variant == Variant::AntiEntropy {
            if line == "/messages" {
                return Self::ListMessages;
            }
            if let Some(id) = line.strip_prefix("/delete-message ") {
                return Self::DeleteMessage(id.trim().to_string());
            }
        }

        Self::Originate(line.to_string())
    }
}

/// Help text listing the commands available for a variant
pub fn help_text(variant: Variant) -> String {
    let mut lines = vec![
        "  /add host:port            -> add peer",
        "  /remove host:port         -> remove peer",
        "  /peers                    -> list peers",
    ];
    if variant == Variant::AntiEntropy {
        lines.push("  /messages                 -> list known messages");
        lines.push("  /delete-message id        -> delete message locally");
    }
    lines.push("  /help                     -> show commands");
    lines.push("  anything else             -> create a new message");
    lines.join("\n")
}
