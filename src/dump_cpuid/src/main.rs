//! The command-line CPUID dumper.
//!
//! ```text
//! > dump_cpuid
//! Leaf           Subleaf         EAX         EBX        ECX          EDX
//! ----------------------------------------------------------------------
//! 00000000       00000000        00000016    756e6547   6c65746e     49656e69
//! 00000001       00000000        000906ea    06100800   7ffafbff     bfebfbff
//! ...
//! ```
//!
//! Identification state can differ between cores. `--core` pins the whole
//! dump to one logical core; `--all-cores` walks every logical core in turn
//! and prints one dump per core.

use anyhow::{Context, Result, ensure};
use clap::Parser;
use cpuid::{HardwareCpuid, decode_row, enumerate, format_rows};

#[derive(Debug, Parser)]
#[command(version, about = "Print CPUID the right way")]
struct Cli {
    /// Pin the dump to this logical core.
    #[arg(long, value_name = "ID", conflicts_with = "all_cores")]
    core: Option<usize>,

    /// Dump every logical core in turn, pinning to each.
    #[arg(long)]
    all_cores: bool,

    /// Append the decoded fields of the leaves with known semantics.
    #[arg(long)]
    decode: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let ops = HardwareCpuid::new()?;

    if cli.all_cores {
        for core_id in core_ids()? {
            ensure!(
                core_affinity::set_for_current(core_id),
                "failed to pin to core {}",
                core_id.id
            );
            println!("CPU{:2}:", core_id.id);
            print_dump(&ops, cli.decode);
        }
        return Ok(());
    }

    if let Some(id) = cli.core {
        let core_id = core_ids()?
            .into_iter()
            .find(|core_id| core_id.id == id)
            .with_context(|| format!("no logical core {id}"))?;
        ensure!(
            core_affinity::set_for_current(core_id),
            "failed to pin to core {id}"
        );
    }
    print_dump(&ops, cli.decode);
    Ok(())
}

fn core_ids() -> Result<Vec<core_affinity::CoreId>> {
    core_affinity::get_core_ids().context("cannot query the logical cores of this system")
}

fn print_dump(ops: &HardwareCpuid, decode: bool) {
    let (info, rows) = enumerate(ops);
    print!("{}", format_rows(&rows));

    if !decode {
        return;
    }
    println!();
    for row in &rows {
        for field in decode_row(row, &info) {
            println!(
                "{:08x}.{}: {} = {}",
                row.query.leaf, row.query.subleaf, field.name, field.value
            );
        }
    }
}
