//! Subcommand definitions, mirroring the teacher's `Args`/`Subcommand` split.

use clap::{Args, Parser, Subcommand};
use clap_num::maybe_hex;

#[derive(Debug, Parser)]
#[command(name = "cood-cli", about = "Inspect and exercise a CANopen object dictionary")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List registered object indices, optionally filtered by an attribute mask
    Enum(EnumArgs),
    /// Describe an object's metadata and subindex layout
    Info(InfoArgs),
    /// Read a single subindex
    Read(ReadArgs),
    /// Write a single subindex
    Write(WriteArgs),
    /// Read an entire object via Complete Access
    Caread(CareadArgs),
    /// Write an entire object via Complete Access
    Cawrite(CawriteArgs),
}

#[derive(Debug, Args)]
pub struct EnumArgs {
    /// Lowest index to include
    #[clap(value_parser=maybe_hex::<u16>, default_value = "0x0000")]
    pub start_index: u16,
    /// Highest index to include
    #[clap(value_parser=maybe_hex::<u16>, default_value = "0xffff")]
    pub last_index: u16,
    /// Only list objects with at least one subindex matching this attribute mask
    #[clap(value_parser=maybe_hex::<u16>, default_value = "0xffff")]
    pub attr_filter: u16,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    #[clap(value_parser=maybe_hex::<u16>)]
    pub index: u16,
    /// First subindex to describe
    #[clap(default_value = "0")]
    pub first_si: u8,
    /// Last subindex to describe (defaults to the object's maximum)
    pub last_si: Option<u8>,
    /// Include subindex names
    #[clap(long)]
    pub names: bool,
    /// Include application-specific metadata
    #[clap(long)]
    pub asm: bool,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    #[clap(value_parser=maybe_hex::<u16>)]
    pub index: u16,
    #[clap(value_parser=maybe_hex::<u8>)]
    pub subindex: u8,
    /// Permission bits presented to the object (defaults to "allow everything")
    #[clap(long, value_parser=maybe_hex::<u16>, default_value = "0xffff")]
    pub permissions: u16,
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    #[clap(value_parser=maybe_hex::<u16>)]
    pub index: u16,
    #[clap(value_parser=maybe_hex::<u8>)]
    pub subindex: u8,
    /// Value to write, parsed according to the subindex's own data type
    pub value: String,
    #[clap(long, value_parser=maybe_hex::<u16>, default_value = "0xffff")]
    pub permissions: u16,
}

#[derive(Debug, Args)]
pub struct CareadArgs {
    #[clap(value_parser=maybe_hex::<u16>)]
    pub index: u16,
    /// Encode SI0 as 16 bits instead of 8
    #[clap(long)]
    pub si0_as_u16: bool,
    /// Omit SI0 from the transfer
    #[clap(long)]
    pub no_si0: bool,
    #[clap(long, value_parser=maybe_hex::<u16>, default_value = "0xffff")]
    pub permissions: u16,
}

#[derive(Debug, Args)]
pub struct CawriteArgs {
    #[clap(value_parser=maybe_hex::<u16>)]
    pub index: u16,
    /// One value per subindex (SI1..SI_max, in order), each parsed per its own type
    #[clap(required = true)]
    pub values: Vec<String>,
    #[clap(long)]
    pub si0_as_u16: bool,
    #[clap(long)]
    pub no_si0: bool,
    #[clap(long, value_parser=maybe_hex::<u16>, default_value = "0xffff")]
    pub permissions: u16,
}
