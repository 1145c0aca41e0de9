//! rscache CLI — legacy cache inspection and ClientScript disassembly.

#[cfg(feature = "fast-alloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Args, Parser, Subcommand};
use rscache::bytestream::ByteReader;
use rscache::opcode_table::OpcodeTable;
use rscache::script_codec::decode_one;
use rscache::{Capabilities, LegacyRecordStore};
use std::io::Write;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "rscache", about = "Legacy cache inspection & ClientScript disassembly")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect which cache layout a directory holds
    Detect { dir: PathBuf },
    /// List available categories with their record counts
    Ls { dir: PathBuf },
    /// Dump one category's index entries
    Index(IndexArgs),
    /// Extract one record's raw bytes
    Get(GetArgs),
    /// Disassemble a ClientScript instruction stream
    Disasm(DisasmArgs),
}

#[derive(Args)]
struct IndexArgs {
    dir: PathBuf,
    category: u8,

    /// Machine-readable JSON instead of the table listing
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct GetArgs {
    dir: PathBuf,
    category: u8,
    record: u32,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct DisasmArgs {
    /// Instruction stream file
    #[arg(short, long)]
    input: PathBuf,

    /// Opcode definition file
    #[arg(short = 't', long)]
    table: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        eprintln!("rscache: {err}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Detect { dir } => {
            let names: Vec<String> = std::fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .collect();
            let format = rscache::detect(&names)?;
            println!("{}", format.label());
        }
        Command::Ls { dir } => {
            let store = open_store(&dir)?;
            for category in store.categories() {
                let index = store.category_index(category)?;
                println!(
                    "{category:>3}  {} records ({} slots)",
                    index.len(),
                    index.slot_count()
                );
            }
        }
        Command::Index(args) => {
            let store = open_store(&args.dir)?;
            let index = store.category_index(args.category)?;
            if args.json {
                let entries: Vec<serde_json::Value> = index
                    .entries()
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "record": e.record,
                            "size": e.size,
                            "offset": e.offset,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("record  size  offset");
                for e in index.entries() {
                    println!("{:>6}  {:>4}  {:>6}", e.record, e.size, e.offset);
                }
            }
        }
        Command::Get(args) => {
            let store = open_store(&args.dir)?;
            let bytes = store.record(args.category, args.record)?;
            match args.output {
                Some(path) => std::fs::write(path, bytes)?,
                None => std::io::stdout().write_all(&bytes)?,
            }
        }
        Command::Disasm(args) => {
            let table = OpcodeTable::load(&args.table)?;
            let data = std::fs::read(&args.input)?;
            let mut reader = ByteReader::new(&data);
            while !reader.at_end() {
                let at = reader.position();
                let instruction = decode_one(&mut reader, &table)?;
                println!("{at:>6}  {instruction}");
            }
        }
    }
    Ok(())
}

fn open_store(dir: &PathBuf) -> Result<LegacyRecordStore, rscache::Error> {
    rscache::open(dir, &Capabilities::full())
}
