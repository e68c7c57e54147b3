// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

use std::{
    io::{self, Write},
    path::Path,
};

use crossterm::style;

pub struct Reporter<W: Write> {
    out: W,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> Reporter<W> {
    #[cfg(test)]
    fn new(out: W) -> Self {
        Self { out }
    }

    pub fn report_directory(&mut self, what: &str, directory: &Path) -> io::Result<()> {
        crossterm::queue!(
            self.out,
            style::SetForegroundColor(style::Color::Green),
            style::Print(format!("✅ {what}")),
            style::ResetColor,
            style::Print(format!(" {}\n", directory.display())),
        )?;
        self.out.flush()
    }

    pub fn report_log(&mut self, records: &[repolink::LogRecord]) -> io::Result<()> {
        for r in records {
            crossterm::queue!(
                self.out,
                style::SetForegroundColor(style::Color::Yellow),
                style::Print(r.hash()),
                style::SetForegroundColor(style::Color::DarkGrey),
                style::Print(format!(" {} ", r.date())),
                style::SetForegroundColor(style::Color::Blue),
                style::Print(r.user()),
                style::ResetColor,
                style::Print(format!(" {}\n", r.message())),
            )?;
        }
        self.out.flush()
    }

    pub fn report_backends(&mut self, names: &[&str]) -> io::Result<()> {
        for n in names {
            crossterm::queue!(self.out, style::Print(format!("{n}\n")))?;
        }
        self.out.flush()
    }
}
