//! Profile import pipeline
//!
//! Turns pasted text or subscription bodies into stored profiles:
//! - [`Importer::import_entry`] handles one descriptor line
//! - [`Importer::import_batch`] handles a newline separated list
//! - [`Importer::resolve`] picks the right decoding for an unknown blob

mod batch;
mod entry;
mod outcome;
mod resolver;
mod selection;

pub use entry::RemarksFilter;
pub use outcome::{BatchReport, DecodeStrategy, EntryOutcome, ImportOutcome, ResolveReport};
pub use selection::{SelectionSnapshot, should_transfer, take_snapshot};

use crate::parser::CodecRegistry;
use crate::store::Store;

/// Import operations over one store and codec registry
#[derive(Clone, Copy)]
pub struct Importer<'a> {
    store: &'a dyn Store,
    registry: &'a CodecRegistry,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a dyn Store, registry: &'a CodecRegistry) -> Self {
        Self { store, registry }
    }
}
