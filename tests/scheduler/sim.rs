/*!
 * Simulated Process World
 *
 * Deterministic stand-in for OS processes and the preemption timer. Each job
 * has an amount of work in milliseconds; a wait consumes up to one armed
 * quantum of it. Expiry is reported exactly like the real timer: the wait is
 * interrupted and the expired flag is set, so the scheduler has to issue the
 * pause itself.
 */

use nix::errno::Errno;
use rr_scheduler::process::{
    ExitStatus, ProcessControl, ProcessError, ProcessResult, StateChange, WaitEvent,
};
use rr_scheduler::scheduler::{QuantumTimer, TimerError};
use rr_scheduler::{JobSpec, Pid};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// Observable side effects, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Spawn(String, Pid),
    Resume(Pid),
    Pause(Pid),
    PauseAbsorbed(Pid),
    Arm(Duration),
    Disarm,
    Kill(Pid),
}

/// Behaviour of one program name
#[derive(Debug, Clone)]
pub struct Script {
    pub work_ms: u64,
    pub exit: ExitStatus,
    /// Exit at the very instant the quantum expires
    pub exits_at_expiry: bool,
    /// Times the job gets stopped by an outside party once the timer is off
    pub external_stops: u32,
    pub spawn_fails: bool,
}

impl Script {
    pub fn work(work_ms: u64) -> Self {
        Self {
            work_ms,
            exit: ExitStatus::Code(0),
            exits_at_expiry: false,
            external_stops: 0,
            spawn_fails: false,
        }
    }

    /// A program none of whose candidates resolve: exits 127 on first run
    pub fn unresolvable() -> Self {
        Self {
            exit: ExitStatus::Code(127),
            ..Self::work(0)
        }
    }

    pub fn exiting_with(mut self, exit: ExitStatus) -> Self {
        self.exit = exit;
        self
    }

    pub fn exits_at_expiry(mut self) -> Self {
        self.exits_at_expiry = true;
        self
    }

    pub fn stopped_externally(mut self, times: u32) -> Self {
        self.external_stops = times;
        self
    }

    pub fn failing_spawn() -> Self {
        Self {
            spawn_fails: true,
            ..Self::work(0)
        }
    }
}

#[derive(Debug)]
struct Job {
    remaining_ms: u64,
    script: Script,
    alive: bool,
    reaped: bool,
    running: bool,
    stop_pending: bool,
}

#[derive(Debug, Default)]
struct World {
    scripts: HashMap<String, Script>,
    jobs: HashMap<Pid, Job>,
    next_pid: i32,
    armed: Option<Duration>,
    expired: bool,
    events: Vec<Event>,
}

/// Shared handle to a simulated world
#[derive(Clone, Default)]
pub struct Sim {
    world: Rc<RefCell<World>>,
}

impl Sim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, program: &str, script: Script) -> Self {
        self.world
            .borrow_mut()
            .scripts
            .insert(program.to_string(), script);
        self
    }

    pub fn control(&self) -> SimControl {
        SimControl {
            world: Rc::clone(&self.world),
        }
    }

    pub fn timer(&self) -> SimTimer {
        SimTimer {
            world: Rc::clone(&self.world),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.world.borrow().events.clone()
    }

    /// PID of the first job spawned as `program`
    pub fn pid_of(&self, program: &str) -> Option<Pid> {
        self.world.borrow().events.iter().find_map(|event| match event {
            Event::Spawn(name, pid) if name == program => Some(*pid),
            _ => None,
        })
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.world
            .borrow()
            .events
            .iter()
            .filter(|event| *event == wanted)
            .count()
    }
}

pub fn specs(programs: &[&str]) -> Vec<JobSpec> {
    programs
        .iter()
        .map(|program| JobSpec::new(*program, vec![], &[]))
        .collect()
}

pub struct SimControl {
    world: Rc<RefCell<World>>,
}

impl ProcessControl for SimControl {
    fn spawn_paused(&mut self, spec: &JobSpec) -> ProcessResult<Pid> {
        let mut world = self.world.borrow_mut();
        let script = world
            .scripts
            .get(&spec.program)
            .cloned()
            .unwrap_or_else(Script::unresolvable);
        if script.spawn_fails {
            return Err(ProcessError::SpawnFailed(spec.program.clone()));
        }

        world.next_pid += 1;
        let pid = Pid::from_raw(1000 + world.next_pid);
        world.jobs.insert(
            pid,
            Job {
                remaining_ms: script.work_ms,
                script,
                alive: true,
                reaped: false,
                running: false,
                stop_pending: false,
            },
        );
        world.events.push(Event::Spawn(spec.program.clone(), pid));
        Ok(pid)
    }

    fn resume(&mut self, pid: Pid) -> ProcessResult<()> {
        let mut world = self.world.borrow_mut();
        let job = world.jobs.get_mut(&pid).ok_or(ProcessError::SignalFailed {
            pid,
            signal: "SIGCONT",
            errno: Errno::ESRCH,
        })?;
        job.running = true;
        world.events.push(Event::Resume(pid));
        Ok(())
    }

    fn pause(&mut self, pid: Pid) -> ProcessResult<()> {
        let mut world = self.world.borrow_mut();
        let alive = match world.jobs.get_mut(&pid) {
            Some(job) if job.alive => {
                job.stop_pending = true;
                true
            }
            _ => false,
        };
        world.events.push(if alive {
            Event::Pause(pid)
        } else {
            Event::PauseAbsorbed(pid)
        });
        Ok(())
    }

    fn wait(&mut self, pid: Pid) -> ProcessResult<WaitEvent> {
        let mut world = self.world.borrow_mut();
        let armed = world.armed;
        let job = world
            .jobs
            .get_mut(&pid)
            .ok_or(ProcessError::WaitFailed {
                pid,
                errno: Errno::ECHILD,
            })?;

        if !job.alive {
            if job.reaped {
                return Err(ProcessError::WaitFailed {
                    pid,
                    errno: Errno::ECHILD,
                });
            }
            job.reaped = true;
            return Ok(WaitEvent::Changed(StateChange::Exited(job.script.exit)));
        }
        if job.stop_pending {
            job.stop_pending = false;
            job.running = false;
            return Ok(WaitEvent::Changed(StateChange::Paused));
        }
        if !job.running {
            // Waiting on a paused job would block forever
            return Err(ProcessError::WaitFailed {
                pid,
                errno: Errno::EDEADLK,
            });
        }

        let Some(quantum) = armed else {
            if job.script.external_stops > 0 {
                job.script.external_stops -= 1;
                job.running = false;
                return Ok(WaitEvent::Changed(StateChange::Paused));
            }
            job.remaining_ms = 0;
            job.alive = false;
            job.reaped = true;
            return Ok(WaitEvent::Changed(StateChange::Exited(job.script.exit)));
        };

        let quantum_ms = quantum.as_millis() as u64;
        if job.script.exits_at_expiry && job.remaining_ms == quantum_ms {
            // Exit and expiry land together: the wait sees the signal first
            job.remaining_ms = 0;
            job.alive = false;
            world.expired = true;
            return Ok(WaitEvent::Interrupted);
        }
        if job.remaining_ms <= quantum_ms {
            job.remaining_ms = 0;
            job.alive = false;
            job.reaped = true;
            return Ok(WaitEvent::Changed(StateChange::Exited(job.script.exit)));
        }
        job.remaining_ms -= quantum_ms;
        world.expired = true;
        Ok(WaitEvent::Interrupted)
    }

    fn kill(&mut self, pid: Pid) -> ProcessResult<()> {
        let mut world = self.world.borrow_mut();
        if let Some(job) = world.jobs.get_mut(&pid) {
            job.alive = false;
            job.reaped = true;
        }
        world.events.push(Event::Kill(pid));
        Ok(())
    }
}

pub struct SimTimer {
    world: Rc<RefCell<World>>,
}

impl QuantumTimer for SimTimer {
    fn arm(&mut self, quantum: Duration) -> Result<(), TimerError> {
        let mut world = self.world.borrow_mut();
        world.armed = Some(quantum);
        world.expired = false;
        world.events.push(Event::Arm(quantum));
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), TimerError> {
        let mut world = self.world.borrow_mut();
        world.armed = None;
        world.expired = false;
        world.events.push(Event::Disarm);
        Ok(())
    }

    fn take_expired(&mut self) -> bool {
        std::mem::take(&mut self.world.borrow_mut().expired)
    }
}
