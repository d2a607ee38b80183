// Console module - THE OPERATOR'S VIEW
// Line-based console that turns operator input into node operations
//
// Presentation only: every command goes through a NodeHandle, and results
// are written as plain text to the given writer.

mod command;

pub use command::{help_text, Command};

use crate::node::{NodeError, NodeHandle, Variant};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Interactive console bound to one node
pub struct Console<W> {
    handle: NodeHandle,
    out: W,
}

impl<W> Console<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(handle: NodeHandle, out: W) -> Self {
        Self { handle, out }
    }

    /// Give back the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print the startup banner
    pub async fn print_banner(&mut self) -> io::Result<()> {
        let variant = self.handle.variant();
        let started = format!(
            "[STARTED] {} node running on {}",
            variant,
            self.handle.local_address()
        );
        self.line(&started).await?;
        self.print_peers().await?;
        match variant {
            Variant::AntiEntropy => {
                self.line("[HINT] Type a message to create a new message.").await?
            }
            Variant::Rumor => self.line("[HINT] Type a message to start a rumor.").await?,
        }
        self.line("[HINT] Commands:").await?;
        self.line(&help_text(variant)).await?;
        self.out.flush().await
    }

    /// Read lines until end of input, executing each one
    pub async fn run<R>(&mut self, input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let command = Command::parse(&line, self.handle.variant());
            self.execute(command).await?;
            self.out.flush().await?;
        }
        Ok(())
    }

    /// Execute one command
    pub async fn execute(&mut self, command: Command) -> io::Result<()> {
        match command {
            Command::Empty => Ok(()),
            Command::Help => {
                self.line("Available commands:").await?;
                self.line(&help_text(self.handle.variant())).await
            }
            Command::ListPeers => self.print_peers().await,
            Command::AddPeer(peer) => {
                let outcome = match self.handle.add_peer(&peer).await {
                    Ok(true) => format!("[PEER] Added: {}", peer),
                    Ok(false) => format!("[PEER] Peer already exists: {}", peer),
                    Err(e) => return self.print_error(e).await,
                };
                self.line(&outcome).await?;
                self.print_peers().await
            }
            Command::RemovePeer(peer) => {
                let outcome = match self.handle.remove_peer(&peer).await {
                    Ok(true) => format!("[PEER] Removed: {}", peer),
                    Ok(false) => format!("[PEER] Peer not found: {}", peer),
                    Err(e) => return self.print_error(e).await,
                };
                self.line(&outcome).await?;
                self.print_peers().await
            }
            Command::ListMessages => match self.handle.list_messages().await {
                Ok(messages) if messages.is_empty() => {
                    self.line("[MESSAGES] No known messages.").await
                }
                Ok(messages) => {
                    self.line("[MESSAGES] Known messages:").await?;
                    for (id, text) in messages {
                        self.line(&format!("  {}: \"{}\"", id, text)).await?;
                    }
                    Ok(())
                }
                Err(e) => self.print_error(e).await,
            },
            Command::DeleteMessage(id) => match self.handle.delete_message(&id).await {
                Ok(true) => {
                    self.line(&format!("[DELETE] Message {} removed locally.", id))
                        .await
                }
                Ok(false) => self.line(&format!("[DELETE] Message {} not found.", id)).await,
                Err(e) => self.print_error(e).await,
            },
            Command::Originate(text) => match self.handle.originate(&text).await {
                Ok(_) => {
                    let confirmation = match self.handle.variant() {
                        Variant::AntiEntropy => format!("[NEW] Message created: \"{}\"", text),
                        Variant::Rumor => format!("[NEW RUMOR] Starting rumor: \"{}\"", text),
                    };
                    self.line(&confirmation).await
                }
                Err(e) => self.print_error(e).await,
            },
        }
    }

    async fn print_peers(&mut self) -> io::Result<()> {
        let peers = match self.handle.list_peers().await {
            Ok(peers) => peers,
            Err(e) => return self.print_error(e).await,
        };
        if peers.is_empty() {
            return self.line("[INFO] No known peers.").await;
        }
        self.line("[INFO] Known peers:").await?;
        for (idx, peer) in peers.iter().enumerate() {
            self.line(&format!("  [{}] {}", idx, peer)).await?;
        }
        Ok(())
    }

    async fn print_error(&mut self, err: NodeError) -> io::Result<()> {
        self.line(&format!("[ERROR] {}", err)).await
    }

    async fn line(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await
    }
}
