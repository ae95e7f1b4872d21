//! Authoring session management.

use borders_core::{
    claim_edges, extract_borders, load_worlds, parse_hex_label, sector_grid, toggle_allegiance, AllegianceGrid,
    AllegianceRules, BorderFormat, BorderLoop, ExtractOptions, GridError, LabelError, MapProcessor, ProcessStep,
    SectorError, WorldRecord,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Not in a session")]
    NotInSession,

    #[error("Session is processing, try again when it completes")]
    Busy,

    #[error("Session is not processing")]
    NotProcessing,

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Sector(#[from] SectorError),

    #[error(transparent)]
    Grid(#[from] GridError),
}

impl SessionError {
    /// Whether the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Busy)
    }
}

/// One sector being authored, shared by every client that joined it.
#[derive(Debug)]
pub struct AuthoringSession {
    pub id: Uuid,
    pub clients: HashSet<Uuid>,
    grid: AllegianceGrid,
    rules: Arc<AllegianceRules>,
    options: ExtractOptions,
    world_count: usize,
    processor: Option<MapProcessor>,
    process_changed: bool,
}

impl AuthoringSession {
    pub fn new(id: Uuid, creator: Uuid, rules: Arc<AllegianceRules>, options: ExtractOptions) -> Self {
        Self {
            id,
            clients: HashSet::from([creator]),
            grid: sector_grid(),
            rules,
            options,
            world_count: 0,
            processor: None,
            process_changed: false,
        }
    }

    pub fn add_client(&mut self, client_id: Uuid) {
        self.clients.insert(client_id);
    }

    /// Remove a client, returns true if session is now empty
    pub fn remove_client(&mut self, client_id: Uuid) -> bool {
        self.clients.remove(&client_id);
        self.clients.is_empty()
    }

    pub fn world_count(&self) -> usize {
        self.world_count
    }

    pub fn grid(&self) -> &AllegianceGrid {
        &self.grid
    }

    pub fn is_processing(&self) -> bool {
        self.processor.is_some()
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.is_processing() {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    pub fn load_worlds(&mut self, worlds: &[WorldRecord]) -> Result<(), SessionError> {
        self.ensure_idle()?;
        load_worlds(&mut self.grid, worlds, &self.rules)?;
        self.world_count = worlds.len();
        Ok(())
    }

    pub fn toggle_hex(&mut self, label: &str) -> Result<bool, SessionError> {
        self.ensure_idle()?;
        let hex = parse_hex_label(label)?;
        Ok(toggle_allegiance(&mut self.grid, hex)?)
    }

    pub fn claim_edges(&mut self) -> Result<bool, SessionError> {
        self.ensure_idle()?;
        Ok(claim_edges(&mut self.grid)?)
    }

    pub fn borders(&self) -> Result<Vec<BorderLoop>, SessionError> {
        Ok(extract_borders(&self.grid, self.options)?)
    }

    pub fn render_borders(&self, format: BorderFormat) -> Result<String, SessionError> {
        let records: Vec<_> = self.borders()?.iter().map(BorderLoop::to_record).collect();
        Ok(format.render(&records))
    }

    /// Queue every allegiance for processing
    pub fn begin_processing(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.processor = Some(MapProcessor::new(&self.grid)?);
        self.process_changed = false;
        Ok(())
    }

    /// Process the next queued allegiance. Returns the step and the number
    /// of allegiances still queued, or `None` once processing is complete.
    pub fn step_processing(&mut self) -> Result<Option<(ProcessStep, usize)>, SessionError> {
        let processor = self.processor.as_mut().ok_or(SessionError::NotProcessing)?;

        match processor.step(&mut self.grid) {
            Ok(Some(step)) => {
                self.process_changed |= step.changed();
                Ok(Some((step, processor.remaining())))
            }
            Ok(None) => {
                self.processor = None;
                Ok(None)
            }
            Err(e) => {
                self.processor = None;
                Err(e.into())
            }
        }
    }

    /// Whether the last completed processing run changed the grid
    pub fn process_changed(&self) -> bool {
        self.process_changed
    }
}
