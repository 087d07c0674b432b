use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    str::FromStr,
};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use r6502::{
    controller::{Event, ExecutionController, ExecutionState, StopReason},
    hexdump,
    instruction::CpuBehavior,
    machine::{Machine, MachineKind},
};

#[derive(Parser)]
#[clap(author, about, long_about = None, version)]
struct Cli {
    /// Machine type to emulate (simple, multicomp, symon, beneater, 6502xt).
    #[clap(short, long)]
    machine: Option<String>,

    /// CPU behavior (6502, 65c02, 65c816).
    #[clap(short, long)]
    cpu: Option<String>,

    /// ROM image loaded into the machine's ROM region.
    #[clap(short, long)]
    rom: Option<PathBuf>,

    /// Halt when a BRK instruction is decoded.
    #[clap(short = 'b', long = "brk")]
    halt_on_brk: bool,

    /// Start execution immediately after loading.
    #[clap(short = 's', long = "start")]
    auto_start: bool,
}

/// Outer lifecycle: pick a machine, run it, possibly come back and
/// pick another.
enum MainState {
    Selecting,
    RunningMachine(MachineKind),
    Exiting,
}

enum ReplOutcome {
    SelectMachine,
    Quit,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Unknown names on the command line are fatal before any machine
    // is built; inside the selection loop they just re-prompt.
    let kind = cli
        .machine
        .as_deref()
        .map(MachineKind::from_str)
        .transpose()
        .context("could not start")?;
    let behavior = cli
        .cpu
        .as_deref()
        .map(CpuBehavior::from_str)
        .transpose()
        .context("could not start")?;

    let mut state = match kind {
        Some(kind) => MainState::RunningMachine(kind),
        None => MainState::Selecting,
    };

    loop {
        state = match state {
            MainState::Selecting => match select_machine()? {
                Some(kind) => MainState::RunningMachine(kind),
                None => MainState::Exiting,
            },
            MainState::RunningMachine(kind) => {
                match Machine::new(kind, behavior, cli.rom.as_deref()) {
                    Ok(mut machine) => {
                        if let Some(acia) = machine.acia_mut() {
                            acia.set_transmit(|byte| {
                                let mut stdout = io::stdout();
                                let _ = stdout.write_all(&[byte]);
                                let _ = stdout.flush();
                            });
                        }

                        let controller = ExecutionController::new(machine, cli.halt_on_brk);
                        if cli.auto_start {
                            controller.start();
                        }
                        match repl(&controller)? {
                            ReplOutcome::SelectMachine => MainState::Selecting,
                            ReplOutcome::Quit => MainState::Exiting,
                        }
                    }
                    Err(err) => {
                        eprintln!("could not build {} machine: {}", kind, err);
                        MainState::Selecting
                    }
                }
            }
            MainState::Exiting => break,
        };
    }

    Ok(())
}

/// Console replacement for the machine-selection dialog. Empty input
/// takes the default; EOF quits.
fn select_machine() -> anyhow::Result<Option<MachineKind>> {
    let names: Vec<String> = MachineKind::ALL.iter().map(|k| k.to_string()).collect();
    println!("machines: {}", names.join(", "));
    loop {
        print!("machine [symon]: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.is_empty() {
            return Ok(Some(MachineKind::Symon));
        }
        match line.parse() {
            Ok(kind) => return Ok(Some(kind)),
            Err(err) => eprintln!("{}", err),
        }
    }
}

fn repl(controller: &ExecutionController) -> anyhow::Result<ReplOutcome> {
    println!("type 'help' for commands");
    let stdin = io::stdin();

    loop {
        while let Some(event) = controller.try_event() {
            print_event(event);
        }

        print!("* ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(ReplOutcome::Quit);
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            [] => (),
            ["help"] => print_help(),
            ["start"] | ["run"] => {
                let was_stopped = controller.state() == ExecutionState::Stopped;
                controller.start();
                if was_stopped {
                    wait_and_print(controller);
                }
            }
            ["stop"] => controller.stop(),
            ["step"] => {
                if controller.state() == ExecutionState::Stopped {
                    controller.step();
                    wait_and_print(controller);
                } else {
                    eprintln!("stop the machine first");
                }
            }
            ["reset"] => {
                controller.reset();
                wait_and_print(controller);
            }
            ["bp", "clear"] => controller.clear_breakpoint(),
            ["bp", addr] => match parse_address(addr) {
                Ok(addr) => controller.set_breakpoint(addr),
                Err(err) => eprintln!("{}", err),
            },
            ["regs"] => {
                let machine = controller.machine();
                let machine = machine.lock().unwrap();
                println!("{}", machine.state());
                println!(
                    "instructions={} cycles={}",
                    controller.instructions(),
                    controller.cycles()
                );
            }
            ["state"] => {
                let machine = controller.machine();
                let state = machine.lock().unwrap().state();
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
            ["map"] => {
                let machine = controller.machine();
                let machine = machine.lock().unwrap();
                print!("{}", machine.bus());
            }
            ["mem", start, end] => match (parse_address(start), parse_address(end)) {
                (Ok(start), Ok(end)) if start <= end => {
                    let machine = controller.machine();
                    let machine = machine.lock().unwrap();
                    print!("{}", hexdump(machine.bus(), start, end));
                }
                _ => eprintln!("usage: mem <start> <end>"),
            },
            ["load", path] => {
                if controller.state() != ExecutionState::Stopped {
                    eprintln!("stop the machine before swapping ROM");
                    continue;
                }
                match std::fs::read(*path) {
                    Ok(image) => {
                        let machine = controller.machine();
                        match machine.lock().unwrap().replace_rom(&image) {
                            Ok(()) => println!("loaded {} bytes from {}", image.len(), path),
                            Err(err) => eprintln!("{}", err),
                        };
                    }
                    Err(err) => eprintln!("cannot read {}: {}", path, err),
                }
            }
            ["machine"] => {
                if controller.state() != ExecutionState::Stopped {
                    eprintln!("stop the machine before reselecting");
                    continue;
                }
                return Ok(ReplOutcome::SelectMachine);
            }
            ["quit"] | ["exit"] => return Ok(ReplOutcome::Quit),
            other => eprintln!("unknown command {:?}, try 'help'", other.join(" ")),
        }
    }
}

fn wait_and_print(controller: &ExecutionController) {
    if let Some(event) = controller.wait_event() {
        print_event(event);
    }
}

fn print_event(event: Event) {
    match event {
        Event::Started => println!("running"),
        Event::Stepped { pc } => println!("stepped to ${:04X}", pc),
        Event::WasReset { pc } => println!("reset to ${:04X}", pc),
        Event::Stopped { pc, reason } => match reason {
            StopReason::Commanded => println!("stopped at ${:04X}", pc),
            StopReason::Breakpoint(addr) => println!("breakpoint at ${:04X}", addr),
            StopReason::Brk => println!("BRK at ${:04X}", pc),
        },
    }
}

fn print_help() {
    println!(
        "commands:\n  start | run        begin continuous execution\n  stop               halt at the next instruction boundary\n  step               execute one instruction\n  reset              reset devices and reload the reset vector\n  bp <addr>          stop when PC reaches addr\n  bp clear           remove the breakpoint\n  regs               show registers and counters\n  state              dump processor state as JSON\n  map                show the attached devices and their ranges\n  mem <start> <end>  hex dump a memory range\n  load <path>        swap in a new ROM image (stopped only)\n  machine            return to machine selection (stopped only)\n  quit               leave the emulator"
    );
}

fn parse_address(s: &str) -> Result<u16, String> {
    let digits = s
        .trim_start_matches('$')
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|_| format!("bad address {:?}", s))
}
