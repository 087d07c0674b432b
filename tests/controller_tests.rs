use std::{thread, time::Duration};

use r6502::{
    controller::{Event, ExecutionController, ExecutionState, StopReason},
    machine::{Machine, MachineKind},
};

#[cfg(test)]
#[ctor::ctor]
fn init() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Simple machine (64K flat RAM) with `program` at $0200 and the reset
/// vector pointing there.
fn machine_with(program: &[u8]) -> Machine {
    let mut machine = Machine::new(MachineKind::Simple, None, None).unwrap();
    let bus = machine.bus_mut();
    bus.write_block(0x0200, program);
    bus.write(0xFFFC, 0x00);
    bus.write(0xFFFD, 0x02);
    machine.reset();
    machine
}

fn wait_for_stop(controller: &ExecutionController) -> (u16, StopReason) {
    loop {
        match controller.wait_event() {
            Some(Event::Stopped { pc, reason }) => return (pc, reason),
            Some(_) => continue,
            None => panic!("event channel closed before a stop arrived"),
        }
    }
}

#[test]
fn stop_lands_on_an_instruction_boundary() {
    // A single three-byte instruction looping on itself: the only
    // valid boundary is its own address.
    let machine = machine_with(&[0x4C, 0x00, 0x02]); // JMP $0200
    let controller = ExecutionController::new(machine, false);

    controller.start();
    thread::sleep(Duration::from_millis(20));
    controller.stop();

    let (pc, reason) = wait_for_stop(&controller);
    assert_eq!(reason, StopReason::Commanded);
    assert_eq!(pc, 0x0200, "never halts inside an instruction");
    assert_eq!(controller.state(), ExecutionState::Stopped);

    let machine = controller.machine();
    let machine = machine.lock().unwrap();
    assert_eq!(machine.cpu().pc(), 0x0200);
}

#[test]
fn counters_increase_while_running() {
    let machine = machine_with(&[0x4C, 0x00, 0x02]);
    let controller = ExecutionController::new(machine, false);

    controller.start();
    thread::sleep(Duration::from_millis(20));
    controller.stop();
    wait_for_stop(&controller);

    assert!(controller.instructions() > 0);
    assert!(controller.cycles() >= controller.instructions() * 3);
}

#[test]
fn breakpoint_stops_with_pc_exactly_at_the_address() {
    let machine = machine_with(&[0xEA, 0xEA, 0xEA, 0xEA, 0x4C, 0x04, 0x02]);
    let controller = ExecutionController::new(machine, false);

    controller.set_breakpoint(0x0202);
    controller.start();

    let (pc, reason) = wait_for_stop(&controller);
    assert_eq!(reason, StopReason::Breakpoint(0x0202));
    assert_eq!(pc, 0x0202, "stops before executing the breakpoint target");
    assert_eq!(controller.instructions(), 2, "exactly the two NOPs before it");
}

#[test]
fn halt_on_brk_reports_the_break() {
    let machine = machine_with(&[0xEA, 0x00, 0xFF, 0xEA]);
    let controller = ExecutionController::new(machine, true);

    controller.start();
    let (pc, reason) = wait_for_stop(&controller);
    assert_eq!(reason, StopReason::Brk);
    assert_eq!(pc, 0x0203, "NOP, then BRK plus its padding byte");
}

#[test]
fn brk_continues_as_software_interrupt_when_not_halting() {
    let mut machine = machine_with(&[0x00, 0xFF]);
    // Point the IRQ vector at an infinite loop so RUNNING has
    // somewhere to go after the BRK.
    let bus = machine.bus_mut();
    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x03);
    bus.write_block(0x0300, &[0x4C, 0x00, 0x03]);
    machine.reset();

    let controller = ExecutionController::new(machine, false);
    controller.start();
    thread::sleep(Duration::from_millis(20));
    controller.stop();
    let (pc, _) = wait_for_stop(&controller);
    assert_eq!(pc, 0x0300, "running inside the BRK handler loop");
}

#[test]
fn step_executes_exactly_one_instruction() {
    let machine = machine_with(&[0xEA, 0xEA]);
    let controller = ExecutionController::new(machine, false);

    controller.step();
    match controller.wait_event() {
        Some(Event::Stepped { pc }) => assert_eq!(pc, 0x0201),
        other => panic!("expected a step event, got {:?}", other),
    }
    assert_eq!(controller.instructions(), 1);
    assert_eq!(controller.cycles(), 2);
    assert_eq!(controller.state(), ExecutionState::Stopped);
}

#[test]
fn reset_stops_and_reloads_the_vector() {
    let machine = machine_with(&[0x4C, 0x00, 0x02]);
    let controller = ExecutionController::new(machine, false);

    controller.start();
    thread::sleep(Duration::from_millis(10));
    controller.reset();

    loop {
        match controller.wait_event() {
            Some(Event::WasReset { pc }) => {
                assert_eq!(pc, 0x0200);
                break;
            }
            Some(_) => continue,
            None => panic!("no reset event"),
        }
    }
    assert_eq!(controller.state(), ExecutionState::Stopped);
}

#[test]
fn breakpoint_can_be_cleared_and_rearmed() {
    let machine = machine_with(&[0xEA, 0xEA, 0xEA, 0x4C, 0x03, 0x02]);
    let controller = ExecutionController::new(machine, false);

    controller.set_breakpoint(0x0201);
    controller.clear_breakpoint();
    controller.set_breakpoint(0x0203);
    controller.start();

    let (pc, reason) = wait_for_stop(&controller);
    assert_eq!(reason, StopReason::Breakpoint(0x0203));
    assert_eq!(pc, 0x0203);
}
