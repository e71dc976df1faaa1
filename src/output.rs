use std::io::{self, Write};

use crossterm::style::Stylize;
use serde::Serialize;

use crate::app::{ExportResult, ProgressEvent, ProgressSink};
use crate::ensembl::{AssemblyInfo, SpeciesInfo};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_species(species: &[SpeciesInfo]) -> io::Result<()> {
        Self::print_json(&species)
    }

    pub fn print_assembly(assembly: &AssemblyInfo) -> io::Result<()> {
        Self::print_json(assembly)
    }

    pub fn print_biotypes(biotypes: &[String]) -> io::Result<()> {
        Self::print_json(&biotypes)
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let message = match event.message.split_once("; ") {
            Some((phase, rest)) if phase.starts_with("phase=") => rest.to_string(),
            _ => event.message,
        };
        match event.elapsed {
            Some(elapsed) => println!(
                "{} {}",
                message,
                format!("({} ms)", elapsed.as_millis()).dark_grey()
            ),
            None => println!("{message}"),
        }
    }
}

impl ConsoleOutput {
    pub fn print_species(species: &[SpeciesInfo]) {
        for (index, info) in species.iter().enumerate() {
            println!("\t{:>2} {} ({})", index + 1, info.display_name, info.name);
        }
    }

    pub fn print_assembly(assembly: &AssemblyInfo) {
        println!("{} {}", "Assembly:".bold(), assembly.assembly_name);
        if assembly.karyotype.is_empty() {
            println!("No karyotype; every region is exported as other_scaffolds.");
        } else {
            println!("{} {}", "Karyotype:".bold(), assembly.karyotype.join(", "));
        }
    }

    pub fn print_biotypes(biotypes: &[String]) {
        for (index, biotype) in biotypes.iter().enumerate() {
            println!("\t{:>2} {biotype}", index + 1);
        }
    }

    pub fn print_export(result: &ExportResult) {
        let cyan = "gmexport summary".cyan();
        println!("{cyan}");
        println!(
            "{} of {} gene models are {}",
            result.filtered_records, result.total_records, result.biotype
        );
        for file in &result.exports {
            println!(
                "{} {} ({} rows) -> {}",
                "exported".green(),
                file.region,
                file.rows,
                file.path
            );
        }
        for region in &result.empty_regions {
            println!("{} {region} (no gene models)", "skipped".yellow());
        }
    }
}
