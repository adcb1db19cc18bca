//! Proposal document rendering
//!
//! Produces a single-page PDF summarizing one proposal.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{Proposal, ProposalStatus};

/// Title shown when the proposal's tender no longer exists.
pub const DELETED_TENDER_TITLE: &str = "Deleted";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Only eligible or ranked proposals can be rendered (status: {0})")]
    NotRenderable(ProposalStatus),
}

/// The fixed set of fields that appear on a proposal document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalDocument {
    pub tender_title: String,
    pub budget: Decimal,
    pub timeline: u32,
    pub materials: Vec<String>,
    pub status: ProposalStatus,
    pub rank: Option<u32>,
}

impl ProposalDocument {
    pub fn for_proposal(
        proposal: &Proposal,
        tender_title: Option<&str>,
    ) -> Result<Self, RenderError> {
        if !proposal.is_renderable() {
            return Err(RenderError::NotRenderable(proposal.status));
        }
        Ok(Self {
            tender_title: tender_title.unwrap_or(DELETED_TENDER_TITLE).to_string(),
            budget: proposal.budget,
            timeline: proposal.timeline,
            materials: proposal.materials.as_slice().to_vec(),
            status: proposal.status,
            rank: proposal.rank,
        })
    }

    fn lines(&self) -> Vec<(Font, String)> {
        let materials = if self.materials.is_empty() {
            "none".to_string()
        } else {
            self.materials.join(", ")
        };
        let rank = self
            .rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "not ranked".to_string());

        vec![
            (Font::Bold, "Proposal".to_string()),
            (Font::Regular, format!("Tender: {}", self.tender_title)),
            (Font::Regular, format!("Budget: {}", self.budget)),
            (Font::Regular, format!("Timeline: {} days", self.timeline)),
            (Font::Regular, format!("Materials: {materials}")),
            (Font::Regular, format!("Status: {}", self.status)),
            (Font::Regular, format!("Rank: {rank}")),
        ]
    }
}

pub trait DocumentRenderer: Send + Sync {
    fn render(&self, document: &ProposalDocument) -> Result<Vec<u8>, RenderError>;

    fn content_type(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    fn size(self) -> u32 {
        match self {
            Font::Regular => 12,
            Font::Bold => 18,
        }
    }
}

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 56;
const LINE_HEIGHT: u32 = 20;
/// Rough Helvetica 12pt capacity of one line between the margins.
const WRAP_COLUMNS: usize = 80;
/// Lines that fit between the top and bottom margins.
const MAX_LINES: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LINE_HEIGHT + 1) as usize;

/// Minimal PDF 1.4 writer using the standard Helvetica fonts.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Wrapped lines of the document, cut to one page. When the text does
    /// not fit, the longest field loses its tail to a `...` line so every
    /// field keeps at least its first line.
    fn layout(document: &ProposalDocument) -> Vec<(Font, String)> {
        let mut blocks: Vec<(Font, Vec<String>)> = document
            .lines()
            .into_iter()
            .map(|(font, text)| (font, wrap(&text, WRAP_COLUMNS)))
            .collect();

        let total: usize = blocks.iter().map(|(_, lines)| lines.len()).sum();
        if total > MAX_LINES {
            let excess = total - MAX_LINES;
            if let Some((_, longest)) = blocks.iter_mut().max_by_key(|(_, lines)| lines.len()) {
                let keep = longest.len().saturating_sub(excess + 1).max(1);
                longest.truncate(keep);
                longest.push("...".to_string());
            }
        }

        blocks
            .into_iter()
            .flat_map(|(font, lines)| lines.into_iter().map(move |line| (font, line)))
            .take(MAX_LINES)
            .collect()
    }

    fn content_stream(document: &ProposalDocument) -> String {
        let mut stream = String::from("BT\n");
        let mut y = PAGE_HEIGHT - MARGIN;
        for (font, line) in Self::layout(document) {
            stream.push_str(&format!(
                "/{} {} Tf\n1 0 0 1 {} {} Tm\n({}) Tj\n",
                font.resource(),
                font.size(),
                MARGIN,
                y,
                escape(&line)
            ));
            y -= LINE_HEIGHT;
        }
        stream.push_str("ET\n");
        stream
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, document: &ProposalDocument) -> Result<Vec<u8>, RenderError> {
        let content = Self::content_stream(document);
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>"
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold >>".to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}endstream",
                content.len(),
                content
            ),
        ];

        let mut out: Vec<u8> = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (index, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", index + 1, body).as_bytes());
        }

        let xref_at = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in &offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        ));
        out.extend_from_slice(xref.as_bytes());
        Ok(out)
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }
}

/// Escape a string for a PDF literal. Non-ASCII characters become `?` since
/// the standard fonts only cover Latin-1 and the stream is written as ASCII.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

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
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
