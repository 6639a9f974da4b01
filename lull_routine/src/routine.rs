//! A running instance of a routine.

use std::rc::Rc;

use lull_common::{Clock, Command};

use crate::desc::RoutineDesc;

/// An instance of a running routine.
pub struct Routine {
    desc: RoutineDesc,
    clock: Rc<dyn Clock>,
    is_finished: bool,
    step_index: usize,
    step_start_ms: u64,
}

impl Routine {
    pub fn new(desc: RoutineDesc, clock: Rc<dyn Clock>) -> Self {
        let step_start_ms = clock.now_ms();

        Self {
            desc,
            clock,
            is_finished: false,
            step_index: 0,
            step_start_ms,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// Run one tick: fire the current step if its delay has elapsed.
    ///
    /// At most one step fires per call, even when several consecutive
    /// steps carry a zero delay.
    pub fn process(&mut self, command_list: &mut Vec<Command>) {
        if self.is_finished {
            return;
        }

        let steps = self.desc.steps();

        if steps.is_empty() {
            if !self.desc.is_looping {
                self.is_finished = true;
            }

            return;
        }

        // Wait until the time is up.
        let step = &steps[self.step_index];

        if self.clock.elapsed_ms(self.step_start_ms) < step.delay_ms as u64 {
            return;
        }

        // Execute the step.
        command_list.push(Command::MoveControl {
            control_name: step.control_name.clone(),
            direction: step.move_direction,
            source: "routine".to_owned(),
        });

        self.advance_step();
    }

    fn advance_step(&mut self) {
        self.step_start_ms = self.clock.now_ms();
        self.step_index += 1;

        if self.step_index < self.desc.steps().len() {
            return;
        }

        // We have reached the end, so either loop or finish.
        if self.desc.is_looping {
            self.step_index = 0;
            return;
        }

        self.is_finished = true;
    }
}

#[cfg(test)]
mod tests {
    use lull_common::{FakeClock, MoveDirection};

    use super::*;
    use crate::desc::Step;

    fn move_command(control_name: &str, direction: MoveDirection) -> Command {
        Command::MoveControl {
            control_name: control_name.to_owned(),
            direction,
            source: "routine".to_owned(),
        }
    }

    #[test]
    fn empty_routine_finishes_immediately() {
        let clock = Rc::new(FakeClock::new());
        let desc = RoutineDesc::new("empty", false);
        let mut routine = Routine::new(desc, clock);

        let mut commands = Vec::new();
        routine.process(&mut commands);

        assert!(routine.is_finished());
        assert!(commands.is_empty());
    }

    #[test]
    fn empty_looping_routine_never_finishes() {
        let clock = Rc::new(FakeClock::new());
        let desc = RoutineDesc::new("sleep", true);
        let mut routine = Routine::new(desc, Rc::clone(&clock) as Rc<dyn Clock>);

        let mut commands = Vec::new();

        for _ in 0..10 {
            clock.advance_ms(1000);
            routine.process(&mut commands);
        }

        assert!(!routine.is_finished());
        assert!(commands.is_empty());
    }

    #[test]
    fn steps_fire_when_their_delay_elapses() {
        let clock = Rc::new(FakeClock::new());

        let mut desc = RoutineDesc::new("wake", false);
        desc.append_step(Step::new(1, "back", MoveDirection::Up));
        desc.append_step(Step::new(2, "back", MoveDirection::Down));

        let mut routine = Routine::new(desc, Rc::clone(&clock) as Rc<dyn Clock>);

        let mut commands = Vec::new();

        // Not enough time has passed for the first step.
        routine.process(&mut commands);
        assert!(commands.is_empty());
        assert!(!routine.is_finished());

        // The first step fires at exactly its delay.
        clock.advance_ms(1);
        routine.process(&mut commands);
        assert_eq!(commands, vec![move_command("back", MoveDirection::Up)]);
        assert!(!routine.is_finished());

        // The second step's delay starts from the first step firing.
        routine.process(&mut commands);
        assert_eq!(commands.len(), 1);

        clock.advance_ms(2);
        routine.process(&mut commands);
        assert_eq!(
            commands,
            vec![
                move_command("back", MoveDirection::Up),
                move_command("back", MoveDirection::Down),
            ]
        );
        assert!(routine.is_finished());

        // Finished routines stay finished and fire nothing more.
        clock.advance_ms(100);
        routine.process(&mut commands);
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn zero_delay_step_fires_on_the_first_tick() {
        let clock = Rc::new(FakeClock::new());

        let mut desc = RoutineDesc::new("now", false);
        desc.append_step(Step::new(0, "legs", MoveDirection::Up));

        let mut routine = Routine::new(desc, clock);

        let mut commands = Vec::new();
        routine.process(&mut commands);

        assert_eq!(commands, vec![move_command("legs", MoveDirection::Up)]);
        assert!(routine.is_finished());
    }

    #[test]
    fn one_step_per_tick_even_with_zero_delays() {
        let clock = Rc::new(FakeClock::new());

        let mut desc = RoutineDesc::new("burst", false);
        desc.append_step(Step::new(0, "back", MoveDirection::Up));
        desc.append_step(Step::new(0, "legs", MoveDirection::Up));

        let mut routine = Routine::new(desc, clock);

        let mut commands = Vec::new();
        routine.process(&mut commands);
        assert_eq!(commands.len(), 1);

        routine.process(&mut commands);
        assert_eq!(commands.len(), 2);
        assert!(routine.is_finished());
    }

    #[test]
    fn looping_routine_wraps_to_the_first_step() {
        let clock = Rc::new(FakeClock::new());

        let mut desc = RoutineDesc::new("rock", true);
        desc.append_step(Step::new(5, "back", MoveDirection::Up));
        desc.append_step(Step::new(5, "back", MoveDirection::Down));

        let mut routine = Routine::new(desc, Rc::clone(&clock) as Rc<dyn Clock>);

        let mut commands = Vec::new();

        for _ in 0..3 {
            clock.advance_ms(5);
            routine.process(&mut commands);
        }

        assert!(!routine.is_finished());
        assert_eq!(
            commands,
            vec![
                move_command("back", MoveDirection::Up),
                move_command("back", MoveDirection::Down),
                move_command("back", MoveDirection::Up),
            ]
        );
    }
}
