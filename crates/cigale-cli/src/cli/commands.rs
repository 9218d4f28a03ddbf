use super::CliError;
use super::helpers::*;
use cigale_core::config::patch_file;
use cigale_core::filters::{band_name_list, band_name_list_with_errors};
use cigale_core::grid::log_spaced_int_ages;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct PlanArgs {
    /// JSON simulation plan
    #[arg(long)]
    plan: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct QuickArgs {
    #[command(flatten)]
    plan: PlanArgs,

    /// Simulate even when the cached table exists
    #[arg(long)]
    force: bool,
}

#[derive(clap::Args)]
pub(super) struct PatchArgs {
    /// Configuration file to rewrite
    #[arg(value_name = "file")]
    file: PathBuf,

    /// Parameters as key=value; comma-separated values become lists
    #[arg(value_name = "key=value", required = true)]
    assignments: Vec<String>,
}

#[derive(clap::Args)]
pub(super) struct BandsArgs {
    #[command(flatten)]
    plan: PlanArgs,

    /// Follow every band with its error column
    #[arg(long)]
    with_errors: bool,
}

#[derive(clap::Args)]
pub(super) struct AgesArgs {
    /// First age of the grid
    #[arg(long)]
    start: f64,

    /// Last age of the grid
    #[arg(long)]
    stop: f64,

    /// Number of log-spaced points before rounding
    #[arg(long)]
    steps: usize,
}

pub(super) fn run_simulation_command(context: &CliContext, args: PlanArgs) -> Result<i32, CliError> {
    let plan = load_plan(&args.plan)?;
    let request = plan.request()?;
    context.driver().run_simulation(&request)?;
    println!(
        "Simulation completed in '{}'.",
        context.working_dir.display()
    );
    Ok(0)
}

pub(super) fn run_fetch_command(context: &CliContext, args: PlanArgs) -> Result<i32, CliError> {
    let plan = load_plan(&args.plan)?;
    let request = plan.request()?;
    let output = plan.output_target(&context.working_dir);
    let table = context
        .driver()
        .simulate_and_fetch(&request, &plan.params, &output)?;
    println!("{}", render_table_summary(&table));
    Ok(0)
}

pub(super) fn run_quick_command(context: &CliContext, args: QuickArgs) -> Result<i32, CliError> {
    let plan = load_plan(&args.plan.plan)?;
    let request = plan.request()?;
    let output = plan.output_target(&context.working_dir);
    let table = context
        .driver()
        .quick_access(&request, &plan.params, &output, args.force)?;
    println!("{}", render_table_summary(&table));
    Ok(0)
}

pub(super) fn run_patch_command(args: PatchArgs) -> Result<i32, CliError> {
    let params = parse_assignments(&args.assignments)?;
    patch_file(&args.file, &params)?;
    println!(
        "Patched {} parameter(s) in '{}'.",
        params.len(),
        args.file.display()
    );
    Ok(0)
}

pub(super) fn run_bands_command(args: BandsArgs) -> Result<i32, CliError> {
    let plan = load_plan(&args.plan.plan)?;
    let names = if args.with_errors {
        band_name_list_with_errors(&plan.bands)
    } else {
        band_name_list(&plan.bands)
    };
    for name in names {
        println!("{}", name);
    }
    Ok(0)
}

pub(super) fn run_ages_command(args: AgesArgs) -> Result<i32, CliError> {
    let ages = log_spaced_int_ages(args.start, args.stop, args.steps)?;
    let rendered = ages
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    println!("{}", rendered);
    Ok(0)
}
