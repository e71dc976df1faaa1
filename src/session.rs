use std::collections::HashSet;
use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::debug;

use crate::domain::{Karyotype, RegionSelection};
use crate::error::GeneModelError;
use crate::export::{ExportWriter, ExportedFile};
use crate::prompt::{self, Menu, prompt_error};
use crate::table::{GeneModelTable, Row};

#[derive(Debug, Clone)]
pub struct RegionMenu {
    karyotype: Karyotype,
    menu: Menu<RegionSelection>,
}

impl RegionMenu {
    pub fn new(karyotype: Karyotype) -> Self {
        let mut options: Vec<(String, RegionSelection)> = karyotype
            .regions()
            .iter()
            .map(|region| (region.clone(), RegionSelection::Named(region.clone())))
            .collect();
        options.push((
            RegionSelection::CatchAll.label().to_string(),
            RegionSelection::CatchAll,
        ));
        Self {
            karyotype,
            menu: Menu::new(options),
        }
    }

    pub fn karyotype(&self) -> &Karyotype {
        &self.karyotype
    }

    pub fn len(&self) -> usize {
        self.menu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menu.is_empty()
    }

    pub fn resolve(&self, token: &str) -> Option<&RegionSelection> {
        self.menu.resolve(token)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.menu.labels()
    }

    pub fn check_tokens(&self, tokens: &[String]) -> Result<(), GeneModelError> {
        match tokens
            .iter()
            .find(|token| !prompt::is_quit(token) && self.resolve(token).is_none())
        {
            Some(token) => Err(GeneModelError::InvalidRegion(token.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub enum SessionState<'t> {
    AwaitingSelection,
    Querying(RegionSelection),
    Writing {
        selection: RegionSelection,
        rows: Vec<&'t Row>,
    },
    Terminated,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub exports: Vec<ExportedFile>,
    pub empty_regions: Vec<String>,
}

impl SessionSummary {
    fn record_export(&mut self, file: ExportedFile) {
        match self.exports.iter_mut().find(|done| done.path == file.path) {
            Some(done) => *done = file,
            None => self.exports.push(file),
        }
    }

    fn record_empty(&mut self, region: &str) {
        if !self.empty_regions.iter().any(|done| done == region) {
            self.empty_regions.push(region.to_string());
        }
    }
}

pub struct ExportSession<'t> {
    table: &'t GeneModelTable,
    regions: RegionMenu,
    writer: ExportWriter,
}

impl<'t> ExportSession<'t> {
    pub fn new(table: &'t GeneModelTable, regions: RegionMenu, writer: ExportWriter) -> Self {
        Self {
            table,
            regions,
            writer,
        }
    }

    pub fn run<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<SessionSummary, GeneModelError> {
        let known: HashSet<&str> = self.regions.karyotype().region_set();
        let mut summary = SessionSummary::default();
        let mut state = SessionState::AwaitingSelection;

        writeln!(output, "At any time, type 'q' in order to exit.").map_err(prompt_error)?;
        writeln!(output).map_err(prompt_error)?;

        loop {
            state = match state {
                SessionState::AwaitingSelection => self.await_selection(input, output)?,
                SessionState::Querying(selection) => {
                    let rows = self.table.query(&selection, &known);
                    debug!(region = %selection, rows = rows.len(), "region query");
                    if rows.is_empty() {
                        writeln!(output, "No genes of this type found in this region.")
                            .map_err(prompt_error)?;
                        writeln!(output).map_err(prompt_error)?;
                        summary.record_empty(selection.label());
                        SessionState::AwaitingSelection
                    } else {
                        SessionState::Writing { selection, rows }
                    }
                }
                SessionState::Writing { selection, rows } => {
                    let path = self.writer.path_for(&selection);
                    writeln!(output, "Writing {} gene models to {path}...", rows.len())
                        .map_err(prompt_error)?;
                    let file = self.writer.write(&selection, self.table.columns(), &rows)?;
                    writeln!(output, "Data written.").map_err(prompt_error)?;
                    writeln!(output).map_err(prompt_error)?;
                    summary.record_export(file);
                    SessionState::AwaitingSelection
                }
                SessionState::Terminated => break,
            };
        }

        Ok(summary)
    }

    fn await_selection<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<SessionState<'t>, GeneModelError> {
        self.regions
            .menu
            .render("Here are the regions/chromosomes to choose from:", output)?;
        prompt::ask(output, "Select a number from above: ")?;
        loop {
            let Some(token) = prompt::read_token(input)? else {
                writeln!(output).map_err(prompt_error)?;
                return Ok(SessionState::Terminated);
            };
            if prompt::is_quit(&token) {
                writeln!(output).map_err(prompt_error)?;
                return Ok(SessionState::Terminated);
            }
            if let Some(selection) = self.regions.resolve(&token) {
                writeln!(output).map_err(prompt_error)?;
                return Ok(SessionState::Querying(selection.clone()));
            }
            prompt::ask(output, "Not a valid choice. Try again: ")?;
        }
    }
}
