//! Read-only view over a session's ordered history.

use super::intervention::InterventionEvent;
use super::statement::{Statement, StatementId};
use super::turn::Turn;
use crate::case::SuppliedNote;

/// Borrowed, ordered view of turns, interventions and supplied notes.
///
/// Statements iterate in transcript order: by round, then sequence.
#[derive(Debug, Clone, Copy)]
pub struct Transcript<'a> {
    turns: &'a [Turn],
    interventions: &'a [InterventionEvent],
    notes: &'a [SuppliedNote],
}

impl<'a> Transcript<'a> {
    pub fn new(
        turns: &'a [Turn],
        interventions: &'a [InterventionEvent],
        notes: &'a [SuppliedNote],
    ) -> Self {
        Self {
            turns,
            interventions,
            notes,
        }
    }

    pub fn turns(self) -> &'a [Turn] {
        self.turns
    }

    pub fn interventions(self) -> &'a [InterventionEvent] {
        self.interventions
    }

    pub fn notes(self) -> &'a [SuppliedNote] {
        self.notes
    }

    pub fn statements(self) -> impl Iterator<Item = &'a Statement> {
        self.turns.iter().flat_map(|t| t.statements().iter())
    }

    /// Statements the agents actually delivered, in transcript order.
    pub fn delivered(self) -> impl Iterator<Item = &'a Statement> {
        self.statements().filter(|s| s.is_delivered())
    }

    pub fn statement(self, id: StatementId) -> Option<&'a Statement> {
        self.turns
            .iter()
            .find(|t| t.round() == id.round)
            .and_then(|t| t.statements().iter().find(|s| s.id() == id))
    }

    pub fn is_empty(self) -> bool {
        self.statements().next().is_none()
    }
}
