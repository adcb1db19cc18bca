//! Service layer modules.
//!
//! Contains the proposal document renderer.

pub mod renderer;

pub use renderer::{DocumentRenderer, PdfRenderer, ProposalDocument, RenderError};
