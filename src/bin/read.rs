use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, bail};
use apfs_types::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use apfsprust::{Error, NodeLocation, OwnedNode, ReadOptions, decode_block, read_block};
use clap::{ArgAction, ArgGroup, Parser};
use itertools::Itertools;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

/// Decode one file-system B-tree node from an APFS image.
#[derive(Parser)]
#[command(name = "read", long_about = None, arg_required_else_help = true)]
#[command(group(ArgGroup::new("location").required(true).args(["block", "node_offset"])))]
struct Cli {
    /// Raw image or device containing the volume
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Byte offset of the volume within the image
    #[arg(short = 'o', long, value_name = "BYTES", default_value_t = 0)]
    volume_offset: u64,

    /// Block number of the node, relative to the volume
    #[arg(short, long, value_name = "NUMBER")]
    block: Option<u64>,

    /// Absolute byte offset of the node within the image
    #[arg(long, value_name = "BYTES", conflicts_with = "volume_offset")]
    node_offset: Option<u64>,

    /// Container block size
    #[arg(short = 's', long, value_name = "BYTES", default_value_t = DEFAULT_BLOCK_SIZE, value_parser = parse_block_size)]
    block_size: u32,

    /// Verify the object checksum before decoding
    #[arg(long)]
    verify_checksum: bool,

    /// Print key and value bytes
    #[arg(short = 'x', long)]
    hexdump: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let location = match (cli.block, cli.node_offset) {
        (_, Some(offset)) => NodeLocation::new(offset, cli.block_size),
        (Some(block), None) => NodeLocation::from_block(cli.volume_offset, block, cli.block_size)
            .context("node offset does not fit in 64 bits")?,
        (None, None) => bail!("either a block number or a node offset is required"),
    };

    println!("Operating on {}", cli.image.display());
    let mut image = File::options()
        .read(true)
        .open(&cli.image)
        .with_context(|| format!("unable to open {}", cli.image.display()))?;

    let options = ReadOptions {
        verify_checksum: cli.verify_checksum,
    };
    let node = read(&mut image, location, options).inspect_err(|e| {
        eprintln!("Failed to read node.");
        eprintln!("\tnode offset: {:#x}", e.offset());
        eprintln!("\tblock size: {}", e.block_size());
        eprintln!("\terror kind: {}", e.kind());
    })?;

    print_node(&node, cli.hexdump);
    Ok(())
}

fn read(image: &mut File, location: NodeLocation, options: ReadOptions) -> Result<OwnedNode, Error> {
    let block = read_block(image, location)?;

    let digest = Sha256::digest(&block);
    println!("Block SHA-256: {}", hex(&digest));

    decode_block(location, &block, options)
}

fn print_node(node: &OwnedNode, hexdump: bool) {
    let object = &node.object;
    println!("Node at offset {:#x}:", node.location.offset);
    println!("\tobject identifier: {}", object.identifier);
    println!("\tobject version: {}", object.version);
    println!("\tobject checksum: {:#018x}", object.checksum);

    let header = &node.header;
    println!("B-tree header:");
    println!("\tflags: {:#06x}", header.flags);
    println!(
        "\tentries: offset {} size {}",
        header.entries_offset, header.entries_size
    );
    println!(
        "\tunused: offset {} size {}",
        header.unused_offset, header.unused_size
    );

    let footer = &node.footer;
    println!("B-tree footer:");
    println!("\tnode size: {}", footer.node_size);
    println!(
        "\tmaximum key size: {}, maximum value size: {}",
        footer.maximum_key_size, footer.maximum_value_size
    );
    println!("\tnumber of entries: {}", footer.number_of_entries);
    println!("\tnumber of nodes: {}", footer.number_of_nodes);
    println!();

    for (index, (entry, record)) in node.entries.iter().zip(&node.records).enumerate() {
        println!(
            "Entry {index}: key {}+{} value {}+{}",
            entry.key.start(),
            entry.key.len(),
            entry.value.start(),
            entry.value.len()
        );
        if hexdump {
            println!("\tkey:");
            dump(&record.key);
            println!("\tvalue:");
            dump(&record.value);
        }
    }
}

fn dump(bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        println!("\t{:08x}  {}", row * 16, chunk.iter().map(|b| format!("{b:02x}")).join(" "));
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).join("")
}

fn parse_block_size(value: &str) -> Result<u32, String> {
    let size: u32 = value.parse().map_err(|e| format!("{e}"))?;
    if !size.is_power_of_two() || !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&size) {
        return Err(format!(
            "block size must be a power of two from {MIN_BLOCK_SIZE} to {MAX_BLOCK_SIZE}"
        ));
    }
    Ok(size)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}
