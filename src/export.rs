//! Render a dream collection as JSON, plain text, or PDF.
//!
//! Pure rendering over `&[Dream]`: the HTTP layer feeds it an owner's
//! dreams, the CLI feeds it the whole store.

use anyhow::{Context, Result};
use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::dreams::types::Dream;

/// Page geometry (A4, millimetres).
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const TOP_Y: f32 = 277.0;
const BOTTOM_Y: f32 = 20.0;
const LINE_STEP: f32 = 6.0;
const FONT_SIZE: f32 = 11.0;

/// Characters per wrapped line in text and PDF output.
const WRAP_WIDTH: usize = 90;

/// Serialize dreams as pretty-printed JSON.
pub fn export_json(dreams: &[Dream]) -> Result<String> {
    serde_json::to_string_pretty(dreams).context("failed to serialize dreams")
}

/// Render dreams as plain text, one block per dream.
pub fn export_text(dreams: &[Dream]) -> String {
    let mut out = String::new();
    for dream in dreams {
        for line in dream_lines(dream) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Render dreams as a PDF document and return its bytes.
pub fn export_pdf(dreams: &[Dream]) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new("Dream Journal", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow::anyhow!("failed to load builtin font: {e}"))?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut y = TOP_Y;

    for dream in dreams {
        for line in dream_lines(dream) {
            if y < BOTTOM_Y {
                let (page, layer_index) =
                    doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
                layer = doc.get_page(page).get_layer(layer_index);
                y = TOP_Y;
            }
            layer.use_text(line, FONT_SIZE, Mm(MARGIN_LEFT), Mm(y), &font);
            y -= LINE_STEP;
        }
        y -= LINE_STEP; // blank line between dreams
    }

    doc.save_to_bytes()
        .map_err(|e| anyhow::anyhow!("failed to serialize PDF: {e}"))
}

/// The text lines one dream renders to.
fn dream_lines(dream: &Dream) -> Vec<String> {
    let mut lines = vec![format!("{} — {}", dream.title, dream.date)];
    lines.extend(wrap(&dream.entry, WRAP_WIDTH));
    if let Some(analysis) = &dream.analysis {
        lines.extend(wrap(&format!("Analysis: {analysis}"), WRAP_WIDTH));
    }
    if let Some(image) = &dream.image {
        lines.push(format!("Image: {image}"));
    }
    lines
}

/// Greedy word wrap at `width` characters.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
