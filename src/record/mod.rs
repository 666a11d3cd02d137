//! Run recording for Ekin searches.
//!
//! The search core reports two kinds of events: a new running maximum, and
//! (with provenance enabled) every confirmed state together with the index
//! of the frontier state it was derived from. The [`Recorder`] turns these
//! into rows and hands them to [`RecordSink`]s.
//!
//! # Row schemas
//!
//! ```text
//! growth:  new_max,iterations
//!          1,0
//!          2,2
//!
//! lineage: id,state,parent
//!          <id>,[0 0 0],
//!          <id>,[0 0 1],<parent id>
//! ```

mod lineage;
mod sink;

pub use lineage::{IdGenerator, RandomIds, SequentialIds};
pub use sink::{CsvSink, MemorySink, MemorySinkHandle, RecordSink, encode_row};

use crate::compute::{Confirmed, StateVector};
use crate::schema::Coord;

/// Header of the growth CSV.
pub const GROWTH_HEADER: [&str; 2] = ["new_max", "iterations"];

/// Header of the lineage CSV.
pub const LINEAGE_HEADER: [&str; 3] = ["id", "state", "parent"];

/// Sink failures.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Sink is closed")]
    Closed,
}

/// A rise of the running maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GrowthRecord {
    /// The new maximum coordinate value.
    pub new_max: Coord,
    /// Zero-based round in which it was first confirmed.
    pub iteration: usize,
}

impl GrowthRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![self.new_max.to_string(), self.iteration.to_string()]
    }
}

fn header(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

/// Lineage channel: identifiers plus a sink.
struct Lineage {
    sink: Box<dyn RecordSink>,
    ids: Box<dyn IdGenerator>,
    /// Identifiers of the frontier currently being expanded, by index.
    frontier_ids: Vec<String>,
}

/// Fans run events out to the growth sink and the optional lineage sink.
pub struct Recorder {
    growth: Box<dyn RecordSink>,
    lineage: Option<Lineage>,
}

impl Recorder {
    /// Record growth only.
    pub fn new(growth: Box<dyn RecordSink>) -> Self {
        Self {
            growth,
            lineage: None,
        }
    }

    /// Also record one lineage row per confirmed state.
    pub fn with_lineage(mut self, sink: Box<dyn RecordSink>, ids: Box<dyn IdGenerator>) -> Self {
        self.lineage = Some(Lineage {
            sink,
            ids,
            frontier_ids: Vec::new(),
        });
        self
    }

    pub fn tracks_lineage(&self) -> bool {
        self.lineage.is_some()
    }

    /// Write header rows and one lineage row per initial frontier state.
    pub fn begin(&mut self, roots: &[StateVector]) -> Result<(), SinkError> {
        self.growth.write_row(&header(&GROWTH_HEADER))?;

        if let Some(lineage) = &mut self.lineage {
            lineage.sink.write_row(&header(&LINEAGE_HEADER))?;
            lineage.frontier_ids.clear();
            for root in roots {
                let id = lineage.ids.new_id();
                lineage
                    .sink
                    .write_row(&[id.clone(), root.to_string(), String::new()])?;
                lineage.frontier_ids.push(id);
            }
        }
        Ok(())
    }

    /// Record a new running maximum.
    pub fn record_growth(&mut self, record: &GrowthRecord) -> Result<(), SinkError> {
        self.growth.write_row(&record.to_row())
    }

    /// Record the states confirmed by one round.
    ///
    /// `confirmed[i].parent` indexes the frontier recorded by the previous
    /// call (or the root). The confirmed states become the new frontier.
    pub fn record_round(&mut self, confirmed: &[Confirmed]) -> Result<(), SinkError> {
        let Some(lineage) = &mut self.lineage else {
            return Ok(());
        };

        let mut next_ids = Vec::with_capacity(confirmed.len());
        for entry in confirmed {
            let id = lineage.ids.new_id();
            let parent = lineage
                .frontier_ids
                .get(entry.parent)
                .cloned()
                .unwrap_or_default();
            lineage
                .sink
                .write_row(&[id.clone(), entry.state.to_string(), parent])?;
            next_ids.push(id);
        }
        lineage.frontier_ids = next_ids;
        Ok(())
    }

    /// Close every sink exactly once, reporting the first failure.
    pub fn close(mut self) -> Result<(), SinkError> {
        let growth = self.growth.close();
        let lineage = match &mut self.lineage {
            Some(lineage) => lineage.sink.close(),
            None => Ok(()),
        };
        growth.and(lineage)
    }
}
