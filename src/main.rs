//! xihierarchy - build XInput2 hierarchy requests from the command line
//!
//! The requests are written to an in-memory connection and printed as a hex
//! dump, one request per line.

use std::env;
use std::process;

use xinput2_hierarchy::{
    change_hierarchy, undefine_device_cursor, ByteOrder, DeviceId, Display, ExtensionInfo,
    HierarchyChange, ReturnMode, Window,
};

/// Major opcode servers usually assign to XInputExtension
const DEFAULT_XINPUT_OPCODE: u8 = 131;

fn print_usage() {
    println!("xihierarchy v{}", xinput2_hierarchy::VERSION);
    println!("Encode XInput2 device hierarchy requests");
    println!();
    println!("Usage: xihierarchy [OPTIONS] CHANGES...");
    println!();
    println!("Options:");
    println!("  -byte-order <lsb|msb>       Wire byte order (default: native)");
    println!("  -opcode <n>                 XInputExtension major opcode (default: 131)");
    println!("  -h, --help                  Show this help message");
    println!();
    println!("Changes (applied in order, sent as one request):");
    println!("  -add <name>                 Add a master device pair");
    println!("  -no-core                    ...that does not send core events");
    println!("  -disabled                   ...that starts disabled");
    println!("  -remove <id>                Remove a master, slaves float");
    println!("  -return-to <ptr> <kbd>      ...attaching its slaves to ptr/kbd");
    println!("  -attach <dev> <master>      Attach a slave to a master");
    println!("  -detach <dev>               Detach a slave");
    println!();
    println!("Other requests (sent after the hierarchy request):");
    println!("  -undefine-cursor <dev> <window>");
    println!();
    println!("Examples:");
    println!("  xihierarchy -add mouse2");
    println!("  xihierarchy -byte-order msb -remove 12 -return-to 2 3 -attach 9 2");
    println!();
}

#[derive(Debug)]
struct Config {
    byte_order: ByteOrder,
    opcode: u8,
    changes: Vec<HierarchyChange>,
    undefine_cursors: Vec<(DeviceId, Window)>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            byte_order: ByteOrder::native(),
            opcode: DEFAULT_XINPUT_OPCODE,
            changes: Vec::new(),
            undefine_cursors: Vec::new(),
        }
    }
}

fn next_value<'a>(args: &'a [String], i: &mut usize, option: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("Missing value for {}", option))
}

fn parse_device(value: &str) -> Result<DeviceId, String> {
    value
        .parse()
        .map(DeviceId::new)
        .map_err(|_| format!("Invalid device id: {}", value))
}

fn parse_window(value: &str) -> Result<Window, String> {
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed
        .map(Window::new)
        .map_err(|_| format!("Invalid window id: {}", value))
}

fn last_add_master<'a>(
    changes: &'a mut [HierarchyChange],
    option: &str,
) -> Result<(&'a mut bool, &'a mut bool), String> {
    match changes.last_mut() {
        Some(HierarchyChange::AddMaster {
            send_core, enable, ..
        }) => Ok((send_core, enable)),
        _ => Err(format!("{} must follow -add", option)),
    }
}

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-byte-order" => {
                config.byte_order = match next_value(args, &mut i, "-byte-order")? {
                    "lsb" => ByteOrder::LSBFirst,
                    "msb" => ByteOrder::MSBFirst,
                    other => return Err(format!("Invalid byte order: {}", other)),
                };
            }
            "-opcode" => {
                let value = next_value(args, &mut i, "-opcode")?;
                config.opcode = value
                    .parse()
                    .map_err(|_| format!("Invalid opcode: {}", value))?;
            }
            "-add" => {
                let name = next_value(args, &mut i, "-add")?;
                config
                    .changes
                    .push(HierarchyChange::add_master(name, true, true));
            }
            "-no-core" => {
                *last_add_master(&mut config.changes, "-no-core")?.0 = false;
            }
            "-disabled" => {
                *last_add_master(&mut config.changes, "-disabled")?.1 = false;
            }
            "-remove" => {
                let device = parse_device(next_value(args, &mut i, "-remove")?)?;
                config.changes.push(HierarchyChange::RemoveMaster {
                    device,
                    return_mode: ReturnMode::Floating,
                });
            }
            "-return-to" => {
                let pointer = parse_device(next_value(args, &mut i, "-return-to")?)?;
                let keyboard = parse_device(next_value(args, &mut i, "-return-to")?)?;
                match config.changes.last_mut() {
                    Some(HierarchyChange::RemoveMaster { return_mode, .. }) => {
                        *return_mode = ReturnMode::AttachToMaster { pointer, keyboard };
                    }
                    _ => return Err("-return-to must follow -remove".to_string()),
                }
            }
            "-attach" => {
                let device = parse_device(next_value(args, &mut i, "-attach")?)?;
                let new_master = parse_device(next_value(args, &mut i, "-attach")?)?;
                config
                    .changes
                    .push(HierarchyChange::AttachSlave { device, new_master });
            }
            "-detach" => {
                let device = parse_device(next_value(args, &mut i, "-detach")?)?;
                config.changes.push(HierarchyChange::DetachSlave { device });
            }
            "-undefine-cursor" => {
                let device = parse_device(next_value(args, &mut i, "-undefine-cursor")?)?;
                let window = parse_window(next_value(args, &mut i, "-undefine-cursor")?)?;
                config.undefine_cursors.push((device, window));
            }
            arg => {
                return Err(format!("Unknown option: {}", arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(4)
        .map(|word| word.iter().map(|b| format!("{:02x}", b)).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    log::info!("Byte order: {}", config.byte_order);
    log::info!("XInputExtension opcode: {}", config.opcode);
    log::info!("Hierarchy changes: {}", config.changes.len());

    let xinput = ExtensionInfo { major_opcode: config.opcode };
    let display = Display::new(Vec::new(), config.byte_order, Some(xinput));

    let mut result = change_hierarchy(&display, &config.changes);
    for (device, window) in &config.undefine_cursors {
        if result.is_err() {
            break;
        }
        result = undefine_device_cursor(&display, *device, *window);
    }

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(1);
    }

    let bytes = match display.into_stream() {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    };

    // Every request starts with its length in words at offset 2
    let mut offset = 0;
    while offset + 4 <= bytes.len() {
        let length = match config.byte_order {
            ByteOrder::LSBFirst => u16::from_le_bytes([bytes[offset + 2], bytes[offset + 3]]),
            ByteOrder::MSBFirst => u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]),
        } as usize
            * 4;
        if length == 0 || offset + length > bytes.len() {
            break;
        }
        println!("{}", hex_dump(&bytes[offset..offset + length]));
        offset += length;
    }
}
