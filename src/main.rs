//! truss2d - direct stiffness analysis of 2D pin-jointed trusses
//!
//! # Usage
//!
//! ```bash
//! truss2d bridge.json --influence 1 7 --member 4
//! ```

mod report;

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use truss2d::{analyze, AnalysisReport, Import, NodeId, ProjectRecords};

use report::{render_report, render_skipped};

/// Analyse a 2D truss project and print displacements, reactions and member forces
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the project file (.json)
    #[arg(value_name = "PROJECT")]
    project: PathBuf,

    /// Compute influence lines for a unit load travelling between two node rows
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    influence: Option<Vec<usize>>,

    /// Only print the influence line of this member row
    #[arg(long, value_name = "ROW", requires = "influence")]
    member: Option<usize>,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Include member geometry and element stiffness matrices
    #[arg(long)]
    details: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let text = fs::read_to_string(&args.project)?;
    let import = ProjectRecords::from_json(&text)?.build();
    if !import.skipped.is_empty() && !args.json {
        print!("{}", render_skipped(&import));
    }
    let member = args
        .member
        .map(|row| {
            import
                .member_id(row)
                .ok_or_else(|| format!("member row {row} was not imported"))
        })
        .transpose()?;

    // An unstable structure is a normal outcome, reported rather than failed.
    let outcome = analyze(&import.truss, &import.options);
    let mut report = AnalysisReport::from_outcome(&outcome);
    if args.details {
        report = report.with_details(&outcome);
    }
    if let (Some(endpoints), Ok(solution)) = (&args.influence, &outcome) {
        let table = solution.influence_lines(
            node_from_row(&import, endpoints[0])?,
            node_from_row(&import, endpoints[1])?,
        )?;
        report = report.with_influence(table);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report, member));
    }

    Ok(())
}

/// Translate a node table row given on the command line into its imported id.
fn node_from_row(import: &Import, row: usize) -> Result<NodeId, String> {
    import
        .node_id(row)
        .ok_or_else(|| format!("node row {row} was not imported"))
}
