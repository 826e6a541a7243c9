use anyhow::{Context, Result};
use colored::*;
use std::io::Write;

/// Where user-visible failure notices go.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Opens the created defect and refreshes the issue view.
pub trait Browser: Send + Sync {
    fn open_in_tab(&self, url: &str) -> Result<()>;
    fn reload(&self, url: &str) -> Result<()>;
}

pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        tracing::debug!(alert = message);
        let _ = write_alert(&mut std::io::stderr(), message);
    }
}

fn write_alert(out: &mut impl Write, message: &str) -> std::io::Result<()> {
    writeln!(out, "{} {}", "!".yellow().bold(), message.yellow())
}

pub struct SystemBrowser {
    /// When false, URLs are printed instead of opened.
    pub open_pages: bool,
}

impl Browser for SystemBrowser {
    fn open_in_tab(&self, url: &str) -> Result<()> {
        println!("{} {}", "Defect:".dimmed(), url.bright_cyan());
        if self.open_pages {
            open::that(url).with_context(|| format!("Failed to open {}", url))?;
        }
        Ok(())
    }

    fn reload(&self, url: &str) -> Result<()> {
        println!("{} {}", "Issue:".dimmed(), url.bright_white());
        if self.open_pages {
            open::that(url).with_context(|| format!("Failed to open {}", url))?;
        }
        Ok(())
    }
}
