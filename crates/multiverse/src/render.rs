//! Plain-text rendering of list views.

use std::io::{self, Write};

use crate::controller::{PageView, Renderer, ViewMode};
use crate::entity::Entity;

/// Writes each rendered page as text: one line per entity followed by a
/// `Page p of n` footer.
pub struct TextRenderer<W: Write> {
    out: W,
    loading: bool,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            loading: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_page<E: Entity>(&mut self, view: &PageView<'_, E>) -> io::Result<()> {
        if view.mode == ViewMode::Search {
            writeln!(self.out, "Search results ({})", view.kind)?;
        }
        if view.page_count == 0 {
            writeln!(self.out, "No results found.")?;
            return self.out.flush();
        }
        for item in view.items {
            writeln!(self.out, "{:>4}  {}  {}", item.id(), item.name(), item.summary())?;
        }
        writeln!(self.out, "Page {} of {}", view.current_page, view.page_count)?;
        self.out.flush()
    }

    fn write_line(&mut self, line: &str) {
        if let Err(error) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!("failed to write output: {error}");
        }
    }
}

impl<E: Entity, W: Write> Renderer<E> for TextRenderer<W> {
    fn show_loading(&mut self) {
        if !self.loading {
            self.loading = true;
            self.write_line("Loading...");
        }
    }

    fn hide_loading(&mut self) {
        self.loading = false;
    }

    fn render(&mut self, view: PageView<'_, E>) {
        if let Err(error) = self.write_page(&view) {
            tracing::warn!(kind = %view.kind, "failed to write page: {error}");
        }
    }

    fn show_error(&mut self, message: &str) {
        self.write_line(&format!("Error: {message}"));
    }
}
