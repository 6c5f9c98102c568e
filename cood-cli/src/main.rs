mod command;
mod demo_od;
mod value_parse;

use clap::Parser;
use command::{Cli, Commands};
use cood_common::remote::ObjectMeta;
use cood_common::stream::{BitStreamReader, BitStreamWriter, RemainingBits};
use cood_common::{codec, AbortCode, DataType};
use cood_core::object::Object;
use cood_core::{ObjectDictionary, ObjectHandle};
use int_enum::IntEnum;
use std::error::Error;
use std::process::ExitCode;

/// Element count implied by a subindex's declared max size, used so Complete
/// Access string padding doesn't run away to `usize::MAX`.
fn max_n_elements(object: &Object, si: u8, data_type: DataType) -> usize {
    let per_element = data_type.size_of(1).max(1);
    let max_bits = object.max_size_bits(si).unwrap_or(per_element as u32) as usize;
    (max_bits / per_element).max(1)
}

/// Writes `n_bits` zero bits, matching the padding a gap subindex occupies in
/// a Complete Access stream.
fn write_zero_bits(writer: &mut BitStreamWriter, mut n_bits: u32) -> Result<(), Box<dyn Error>> {
    while n_bits > 0 {
        let chunk = n_bits.min(32);
        writer.write_bits(0, chunk as u8)?;
        n_bits -= chunk;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let od = demo_od::build();

    match run(&od, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(od: &ObjectDictionary, command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Enum(args) => cmd_enum(od, args),
        Commands::Info(args) => cmd_info(od, args),
        Commands::Read(args) => cmd_read(od, args),
        Commands::Write(args) => cmd_write(od, args),
        Commands::Caread(args) => cmd_caread(od, args),
        Commands::Cawrite(args) => cmd_cawrite(od, args),
    }
}

fn resolve(od: &ObjectDictionary, index: u16) -> Result<ObjectHandle, Box<dyn Error>> {
    let handle = od.get(index);
    if handle.is_empty() {
        return Err(format!("{:#06x}: {}", index, AbortCode::ObjectDoesNotExist.name()).into());
    }
    Ok(handle)
}

fn cmd_enum(od: &ObjectDictionary, args: command::EnumArgs) -> Result<(), Box<dyn Error>> {
    for index in od.indices() {
        if index < args.start_index || index > args.last_index {
            continue;
        }
        let handle = od.get(index);
        let Some(object) = handle.object() else { continue };
        let matches = (0..=object.max_n_subindices()).any(|si| {
            object
                .attributes(si)
                .map(|a| a.intersect(args.attr_filter).0 != 0)
                .unwrap_or(false)
        });
        if !matches {
            continue;
        }
        println!(
            "{:#06x}  {:?}  {}",
            index,
            object.object_code(),
            object.object_name().unwrap_or("-")
        );
    }
    Ok(())
}

fn cmd_info(od: &ObjectDictionary, args: command::InfoArgs) -> Result<(), Box<dyn Error>> {
    let handle = resolve(od, args.index)?;
    let object = handle.object().expect("just resolved");
    let ObjectMeta { object_code, data_type, max_n_subindices } = object.object_meta();
    println!(
        "{:#06x} {} -- {:?}, element type {:?}, {} subindices",
        args.index,
        object.object_name().unwrap_or("-"),
        object_code,
        data_type,
        max_n_subindices
    );

    let last_si = args.last_si.unwrap_or(max_n_subindices);
    for si in args.first_si..=last_si {
        let Some(dt) = object.data_type(si) else { continue };
        let attrs = object.attributes(si).unwrap_or_default();
        let size = object.max_size_bits(si).unwrap_or(0);
        print!(
            "  SI{si}: {:?}  attrs={:#06x}  max_size_bits={size}",
            dt, attrs.0
        );
        if object.is_empty(si) {
            print!("  (empty)");
        } else if object.is_gap(si) {
            print!("  (gap)");
        }
        if args.names {
            if let Some(name) = object.name(si) {
                print!("  \"{name}\"");
            }
        }
        if args.asm {
            if let Some(asm) = object.app_specific_metadata(si) {
                print!("  asm={asm:02x?}");
            }
        }
        println!();
    }
    Ok(())
}

fn cmd_read(od: &ObjectDictionary, args: command::ReadArgs) -> Result<(), Box<dyn Error>> {
    let handle = resolve(od, args.index)?;
    let object = handle.object().expect("just resolved");

    let mut writer = BitStreamWriter::new();
    let abort = object.read(args.subindex, args.permissions, &mut writer)?;
    if abort != AbortCode::Ok {
        return Err(format!("{}: {}", abort.int_value(), abort.name()).into());
    }

    let bytes = writer.into_bytes();
    let data_type = object.data_type(args.subindex).unwrap_or_default();
    let mut reader = BitStreamReader::new(&bytes);
    let value = codec::decode(&mut reader, data_type, 0)?;
    println!("{value:?}");
    Ok(())
}

fn cmd_write(od: &ObjectDictionary, args: command::WriteArgs) -> Result<(), Box<dyn Error>> {
    let handle = resolve(od, args.index)?;
    let object = handle.object().expect("just resolved");

    let data_type = object
        .data_type(args.subindex)
        .ok_or_else(|| AbortCode::SubindexDoesNotExist.name().to_string())?;
    let value = value_parse::parse_value(data_type, &args.value)?;
    let max_n = max_n_elements(object, args.subindex, data_type);

    let mut writer = BitStreamWriter::new();
    codec::encode(&value, max_n, &mut writer, false)?;
    let bytes = writer.into_bytes();
    let mut reader = BitStreamReader::new(&bytes);

    let abort = object.write(args.subindex, args.permissions, &mut reader)?;
    if abort != AbortCode::Ok {
        return Err(format!("{}: {}", abort.int_value(), abort.name()).into());
    }
    println!("ok");
    Ok(())
}

fn cmd_caread(od: &ObjectDictionary, args: command::CareadArgs) -> Result<(), Box<dyn Error>> {
    let handle = resolve(od, args.index)?;
    let object = handle.object().expect("just resolved");
    let include_si0 = !args.no_si0;

    let mut writer = BitStreamWriter::new();
    let abort = object.complete_read(include_si0, args.si0_as_u16, args.permissions, &mut writer)?;
    if abort != AbortCode::Ok {
        return Err(format!("{}: {}", abort.int_value(), abort.name()).into());
    }

    let bytes = writer.into_bytes();
    println!("{} bytes: {bytes:02x?}", bytes.len());
    Ok(())
}

fn cmd_cawrite(od: &ObjectDictionary, args: command::CawriteArgs) -> Result<(), Box<dyn Error>> {
    let handle = resolve(od, args.index)?;
    let object = handle.object().expect("just resolved");
    let include_si0 = !args.no_si0;
    let max_n_subindices = object.max_n_subindices();

    if args.values.len() != max_n_subindices as usize {
        return Err(format!(
            "object has {max_n_subindices} subindices, {} values given",
            args.values.len()
        )
        .into());
    }

    let mut writer = BitStreamWriter::new();
    if include_si0 {
        let si0 = object.n_subindices().saturating_sub(1);
        if args.si0_as_u16 {
            writer.write_uint16(si0 as u16)?;
        } else {
            writer.write_uint8(si0)?;
        }
    }
    for (i, raw) in args.values.iter().enumerate() {
        let si = (i + 1) as u8;
        if object.is_empty(si) {
            continue;
        }
        let Some(data_type) = object.data_type(si) else { continue };
        if !data_type.is_bit_based() {
            writer.align_to_byte_boundary(false)?;
        }
        if object.is_gap(si) {
            write_zero_bits(&mut writer, object.max_size_bits(si).unwrap_or(0))?;
            continue;
        }
        let value = value_parse::parse_value(data_type, raw)?;
        let max_n = max_n_elements(object, si, data_type);
        codec::encode(&value, max_n, &mut writer, true)?;
    }
    let bytes = writer.into_bytes();
    let mut reader = BitStreamReader::new(&bytes);

    let abort = object.complete_write(
        include_si0,
        args.si0_as_u16,
        args.permissions,
        &mut reader,
        RemainingBits::SevenOrLess,
    )?;
    if abort != AbortCode::Ok {
        return Err(format!("{}: {}", abort.int_value(), abort.name()).into());
    }
    println!("ok");
    Ok(())
}
