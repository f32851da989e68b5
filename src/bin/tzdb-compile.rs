//! The CLI entry point: resolves which tz database version to compile,
//! reads its input files from disk, and writes the compiled binary
//! repository.
//!
//! The hard engineering lives in the library (`tzdb_compiler`); this
//! binary is just the invocation contract of `spec.md` §6 wired up with
//! `clap` for argument parsing and `log`/`env_logger` for diagnostics,
//! the same pairing the pack's `zoneinfo-test-gen` binary uses.

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use tzdb_compiler::compile::{self, CompileOptions};
use tzdb_compiler::error::Error;

/// Compiles the IANA tz database source corpus into a compact binary
/// zone repository.
#[derive(Parser, Debug)]
#[command(name = "tzdb-compile", version, about)]
struct Cli {
    /// Log at debug level instead of warn.
    #[arg(long)]
    verbose: bool,

    /// Keep leading LMT eras instead of eliding them.
    #[arg(long)]
    lmt: bool,

    /// Extract a tzdata<version>.tar.gz archive before compiling.
    ///
    /// Archive extraction is out of scope for this compiler; this flag
    /// exists for interface parity and always fails.
    #[arg(long)]
    unpack: bool,

    /// Compile the selected corpus version into a binary repository.
    #[arg(long)]
    compile: bool,

    /// Directory to look for tzdata<version> directories/archives in,
    /// and to write the compiled repository under.
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// The corpus version to compile (e.g. "2023b"). Defaults to the
    /// newest one found in `workdir`.
    #[arg(long)]
    version: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new().filter_level(level).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    if cli.unpack {
        return Err(Error::Unsupported(
            "extracting a tzdata<version>.tar.gz archive",
        ));
    }

    if !cli.compile {
        log::info!("nothing to do (pass --compile to compile a corpus version)");
        return Ok(());
    }

    let discovered = tzdb_compiler::versions::resolve(cli.version.as_deref(), &cli.workdir)?;
    log::info!("compiling tzdata{}", discovered.version);

    if !discovered.is_directory {
        return Err(Error::Unsupported(
            "compiling directly from a tzdata<version>.tar.gz archive; extract it first",
        ));
    }

    let sources = read_sources(&discovered.path)?;

    let options = CompileOptions {
        include_lmt: cli.lmt,
        version: discovered.version.clone(),
    };

    let repository = compile::compile(&sources, &options)?;
    log::info!(
        "synthesised {} zones, {} aliases, {} leap seconds",
        repository.zones.len(),
        repository.aliases.len(),
        repository.leap_seconds.len()
    );

    let out_dir = cli.workdir.join(format!("tzdata{}", discovered.version));
    fs::create_dir_all(&out_dir)?;
    let out_path = out_dir.join("tzdata.repository");

    let file = fs::File::create(&out_path)?;
    let mut writer = BufWriter::new(file);
    repository.write_to(&mut writer)?;
    writer.flush()?;

    log::info!("wrote {}", out_path.display());
    Ok(())
}

/// Reads every recognised input file present in `dir` into the
/// `filename -> text` map `compile::compile` expects. Files from the
/// input set that aren't present are simply omitted, not an error —
/// not every corpus snapshot carries every auxiliary file.
fn read_sources(dir: &Path) -> Result<HashMap<String, String>, Error> {
    let mut sources = HashMap::new();
    for filename in compile::INPUT_FILES {
        let path = dir.join(filename);
        if path.is_file() {
            sources.insert((*filename).to_owned(), fs::read_to_string(&path)?);
        }
    }
    Ok(sources)
}
