use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use serde::{Deserialize, Serialize};

use crate::{
    cpu::BrkPolicy,
    machine::Machine,
};

#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub enum ExecutionState {
    Stopped,
    Running,
    Stepping,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Step,
    Reset,
    SetBreakpoint(u16),
    ClearBreakpoint,
    Shutdown,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StopReason {
    Commanded,
    Breakpoint(u16),
    Brk,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    Started,
    Stepped { pc: u16 },
    Stopped { pc: u16, reason: StopReason },
    WasReset { pc: u16 },
}

/// Drives `Machine::step` on a dedicated thread. All outside
/// communication is commands in, events out; the machine itself is
/// behind a mutex the worker holds only for the duration of one
/// instruction, so a stop always lands on an instruction boundary and
/// anything reading the machine sees consistent state.
///
/// Mutating the machine from outside (memory pokes, ROM swaps) is only
/// well-defined while `state()` is `Stopped`.
pub struct ExecutionController {
    machine: Arc<Mutex<Machine>>,
    state: Arc<Mutex<ExecutionState>>,
    commands: Sender<Command>,
    events: Receiver<Event>,
    cycles: Arc<AtomicU64>,
    instructions: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl ExecutionController {
    pub fn new(mut machine: Machine, halt_on_brk: bool) -> Self {
        machine.cpu_mut().set_brk_policy(if halt_on_brk {
            BrkPolicy::Halt
        } else {
            BrkPolicy::SoftwareInterrupt
        });

        let machine = Arc::new(Mutex::new(machine));
        let state = Arc::new(Mutex::new(ExecutionState::Stopped));
        let cycles = Arc::new(AtomicU64::new(0));
        let instructions = Arc::new(AtomicU64::new(0));
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let worker = Worker {
            machine: machine.clone(),
            state: state.clone(),
            commands: command_rx,
            events: event_tx,
            cycles: cycles.clone(),
            instructions: instructions.clone(),
            halt_on_brk,
            breakpoint: None,
        };
        let handle = thread::Builder::new()
            .name("execution".into())
            .spawn(move || worker.run())
            .expect("failed to spawn execution thread");

        ExecutionController {
            machine,
            state,
            commands: command_tx,
            events: event_rx,
            cycles,
            instructions,
            worker: Some(handle),
        }
    }

    /// Shared handle to the machine. Lock it only while `Stopped`
    /// unless the access is read-only display state.
    pub fn machine(&self) -> Arc<Mutex<Machine>> {
        self.machine.clone()
    }

    pub fn state(&self) -> ExecutionState {
        *self.state.lock().unwrap()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn instructions(&self) -> u64 {
        self.instructions.load(Ordering::Relaxed)
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn step(&self) {
        self.send(Command::Step);
    }

    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    pub fn set_breakpoint(&self, address: u16) {
        self.send(Command::SetBreakpoint(address));
    }

    pub fn clear_breakpoint(&self) {
        self.send(Command::ClearBreakpoint);
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::error!("execution thread is gone, dropping {:?}", command);
        }
    }

    /// Non-blocking poll of the event stream.
    pub fn try_event(&self) -> Option<Event> {
        self.events.try_recv().ok()
    }

    /// Wait for the next event, e.g. the stop notification after a
    /// breakpoint is hit.
    pub fn wait_event(&self) -> Option<Event> {
        self.events.recv().ok()
    }
}

impl Drop for ExecutionController {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

struct Worker {
    machine: Arc<Mutex<Machine>>,
    state: Arc<Mutex<ExecutionState>>,
    commands: Receiver<Command>,
    events: Sender<Event>,
    cycles: Arc<AtomicU64>,
    instructions: Arc<AtomicU64>,
    halt_on_brk: bool,
    breakpoint: Option<u16>,
}

impl Worker {
    fn run(mut self) {
        loop {
            let running = *self.state.lock().unwrap() == ExecutionState::Running;

            if running {
                // Commands are polled between instructions, so a stop
                // can never observe a half-executed instruction.
                loop {
                    match self.commands.try_recv() {
                        Ok(Command::Shutdown) => return,
                        Ok(command) => self.handle(command),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => return,
                    }
                }
                if *self.state.lock().unwrap() == ExecutionState::Running {
                    if let Some((pc, reason)) = self.step_once() {
                        self.set_state(ExecutionState::Stopped);
                        self.emit(Event::Stopped { pc, reason });
                    }
                }
            } else {
                match self.commands.recv() {
                    Ok(Command::Shutdown) => return,
                    Ok(command) => self.handle(command),
                    Err(_) => return,
                }
            }
        }
    }

    /// Execute one instruction; `Some` means execution must stop.
    fn step_once(&mut self) -> Option<(u16, StopReason)> {
        let mut machine = self.machine.lock().unwrap();
        let step = machine.step();
        let pc = machine.cpu().pc();
        drop(machine);

        self.cycles.fetch_add(step.cycles as u64, Ordering::Relaxed);
        self.instructions.fetch_add(1, Ordering::Relaxed);

        if step.brk && self.halt_on_brk {
            tracing::info!("BRK at ${:04X}, halting", pc);
            return Some((pc, StopReason::Brk));
        }
        if self.breakpoint == Some(pc) {
            tracing::info!("breakpoint at ${:04X}", pc);
            return Some((pc, StopReason::Breakpoint(pc)));
        }
        None
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => {
                if *self.state.lock().unwrap() == ExecutionState::Stopped {
                    self.set_state(ExecutionState::Running);
                    self.emit(Event::Started);
                }
            }
            Command::Stop => {
                if *self.state.lock().unwrap() == ExecutionState::Running {
                    self.set_state(ExecutionState::Stopped);
                    let pc = self.machine.lock().unwrap().cpu().pc();
                    self.emit(Event::Stopped {
                        pc,
                        reason: StopReason::Commanded,
                    });
                }
            }
            Command::Step => {
                if *self.state.lock().unwrap() == ExecutionState::Stopped {
                    self.set_state(ExecutionState::Stepping);
                    let stopped = self.step_once();
                    self.set_state(ExecutionState::Stopped);
                    match stopped {
                        Some((pc, reason)) => self.emit(Event::Stopped { pc, reason }),
                        None => {
                            let pc = self.machine.lock().unwrap().cpu().pc();
                            self.emit(Event::Stepped { pc });
                        }
                    }
                }
            }
            Command::Reset => {
                self.set_state(ExecutionState::Stopped);
                let mut machine = self.machine.lock().unwrap();
                machine.reset();
                let pc = machine.cpu().pc();
                drop(machine);
                self.emit(Event::WasReset { pc });
            }
            Command::SetBreakpoint(address) => self.breakpoint = Some(address),
            Command::ClearBreakpoint => self.breakpoint = None,
            Command::Shutdown => unreachable!("shutdown is handled by the loop"),
        }
    }

    fn set_state(&self, state: ExecutionState) {
        *self.state.lock().unwrap() = state;
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::trace!("no listener for {:?}", event);
        }
    }
}
