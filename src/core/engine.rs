/// Single-task match engine: serializes guesses and timer ticks, owns the timers
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::config::MatchConfig;
use crate::core::controller::{GuessResult, MatchController, MatchEvent, MatchSnapshot};
use crate::core::error::MatchError;
use crate::core::store::{MatchStore, NoopStore};
use crate::puzzle::{Puzzle, WordId};

const CLOCK_PERIOD: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 100;

/// A match event tagged with the match it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub generation: u64,
    pub event: MatchEvent,
}

pub(crate) enum Command {
    StartNewMatch {
        puzzle: Arc<Puzzle>,
        config: MatchConfig,
    },
    SubmitGuess {
        word: WordId,
        guess: String,
        reply: oneshot::Sender<Result<GuessResult, MatchError>>,
    },
    ClockTick {
        generation: u64,
    },
    OpponentTick {
        generation: u64,
    },
    Shutdown,
}

/// Commands in, snapshots and events out. Cheap to clone.
#[derive(Clone)]
pub struct MatchHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<Option<MatchSnapshot>>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl MatchHandle {
    /// Replaces whatever match is running; its pending ticks become no-ops
    pub fn start_new_match(&self, puzzle: Arc<Puzzle>, config: MatchConfig) -> Result<(), MatchError> {
        self.cmd_tx
            .send(Command::StartNewMatch { puzzle, config })
            .map_err(|_| MatchError::EngineClosed)
    }

    pub async fn submit_guess(&self, word: WordId, guess: impl Into<String>) -> Result<GuessResult, MatchError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SubmitGuess { word, guess: guess.into(), reply })
            .map_err(|_| MatchError::EngineClosed)?;
        rx.await.map_err(|_| MatchError::EngineClosed)?
    }

    /// Latest published state, None before the first match
    pub fn snapshot(&self) -> Option<MatchSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Waits for a snapshot this handle has not seen through `changed` yet
    pub async fn changed(&mut self) -> Result<Option<MatchSnapshot>, MatchError> {
        self.snapshot_rx.changed().await.map_err(|_| MatchError::EngineClosed)?;
        Ok(self.snapshot_rx.borrow_and_update().clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }

    #[cfg(test)]
    pub(crate) fn send_raw(&self, cmd: Command) {
        let _ = self.cmd_tx.send(cmd);
    }
}

pub struct MatchEngine {
    controller: Option<MatchController>,
    generation: u64,
    timers: Vec<JoinHandle<()>>,
    cmd_tx: mpsc::WeakUnboundedSender<Command>,
    snapshot_tx: watch::Sender<Option<MatchSnapshot>>,
    event_tx: broadcast::Sender<EngineEvent>,
    store: Box<dyn MatchStore>,
}

impl MatchEngine {
    /// Spawns the engine on the current runtime and returns its handle
    pub fn spawn() -> (MatchHandle, JoinHandle<()>) {
        Self::spawn_with_store(Box::new(NoopStore))
    }

    pub fn spawn_with_store(store: Box<dyn MatchStore>) -> (MatchHandle, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let engine = MatchEngine {
            controller: None,
            generation: 0,
            timers: Vec::new(),
            cmd_tx: cmd_tx.downgrade(),
            snapshot_tx,
            event_tx: event_tx.clone(),
            store,
        };
        let task = tokio::spawn(engine.run(cmd_rx));

        (MatchHandle { cmd_tx, snapshot_rx, event_tx }, task)
    }

    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::StartNewMatch { puzzle, config } => self.start_match(puzzle, config),
                Command::SubmitGuess { word, guess, reply } => {
                    let result = match self.controller.as_mut() {
                        Some(ctl) => ctl.submit_guess(word, &guess),
                        None => Err(MatchError::MatchFinished),
                    };
                    self.publish();
                    let _ = reply.send(result);
                }
                Command::ClockTick { generation } => {
                    if let Some(ctl) = self.live_controller(generation, "clock") {
                        ctl.tick_clock();
                        self.publish();
                    }
                }
                Command::OpponentTick { generation } => {
                    if let Some(ctl) = self.live_controller(generation, "opponent") {
                        if let Err(e) = ctl.opponent_auto_solve_tick() {
                            debug!(error = %e, "opponent tick rejected");
                        }
                        self.publish();
                    }
                }
                Command::Shutdown => break,
            }
        }

        self.stop_timers();
        info!("match engine stopped");
    }

    fn start_match(&mut self, puzzle: Arc<Puzzle>, config: MatchConfig) {
        self.stop_timers();
        self.generation += 1;
        let generation = self.generation;

        info!(generation, puzzle = puzzle.id(), ?config, "starting new match");
        self.controller = Some(MatchController::new(puzzle, &config));

        if config.is_timed() {
            let clock = self.spawn_ticker(CLOCK_PERIOD, move || Command::ClockTick { generation });
            self.timers.push(clock);
        }
        let opponent = self.spawn_ticker(config.opponent_interval(), move || Command::OpponentTick { generation });
        self.timers.push(opponent);

        self.publish();
    }

    /// The running controller, if the tick belongs to it and it is still in play
    fn live_controller(&mut self, generation: u64, source: &str) -> Option<&mut MatchController> {
        if generation != self.generation {
            debug!(generation, current = self.generation, source, "dropping tick from a replaced match");
            return None;
        }
        self.controller.as_mut().filter(|ctl| !ctl.is_finished())
    }

    /// Pushes events and the new snapshot out; winds down a finished match
    fn publish(&mut self) {
        let Some(ctl) = self.controller.as_mut() else {
            return;
        };

        let mut finished = false;
        for event in ctl.drain_events() {
            finished |= matches!(event, MatchEvent::MatchFinished { .. });
            // No subscribers is fine
            let _ = self.event_tx.send(EngineEvent { generation: self.generation, event });
        }
        self.snapshot_tx.send_replace(Some(ctl.snapshot(self.generation)));

        if finished {
            for timer in self.timers.drain(..) {
                timer.abort();
            }
            if let Err(e) = self.store.save(ctl.state()) {
                warn!(error = %e, "could not store finished match");
            }
        }
    }

    fn spawn_ticker<F>(&self, period: Duration, make: F) -> JoinHandle<()>
    where
        F: Fn() -> Command + Send + 'static,
    {
        let weak = self.cmd_tx.clone();
        tokio::spawn(async move {
            let Some(start) = Instant::now().checked_add(period) else {
                warn!(?period, "ticker period too long for the clock, ticker not started");
                return;
            };
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(tx) = weak.upgrade() else { break };
                if tx.send(make()).is_err() {
                    break;
                }
            }
        })
    }

    fn stop_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::{MatchOutcome, MatchState, Phase, Solver};
    use crate::puzzle::Word;
    use std::sync::Mutex;

    fn cpu_ram() -> Arc<Puzzle> {
        Arc::new(
            Puzzle::new(
                "cpu-ram",
                "",
                1,
                9,
                vec![Word::across(1, 0, 0, "CPU", "Brain"), Word::across(2, 0, 6, "RAM", "Memory")],
            )
            .unwrap(),
        )
    }

    fn config(duration: Option<u32>, interval: u64) -> MatchConfig {
        MatchConfig { duration_secs: duration, opponent_interval_secs: interval, seed: Some(3) }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn guesses_go_through_the_engine() {
        let (handle, _task) = MatchEngine::spawn();
        assert!(handle.snapshot().is_none());
        assert_eq!(handle.submit_guess(WordId::across(1), "CPU").await, Err(MatchError::MatchFinished));

        handle.start_new_match(cpu_ram(), config(Some(60), 30)).unwrap();
        assert_eq!(handle.submit_guess(WordId::across(1), "cpu").await, Ok(GuessResult::Correct));
        assert_eq!(handle.submit_guess(WordId::across(1), "cpu").await, Ok(GuessResult::AlreadySolved));
        assert_eq!(handle.submit_guess(WordId::across(2), "rom").await, Ok(GuessResult::Incorrect));

        let snap = handle.snapshot().unwrap();
        assert_eq!(snap.generation, 1);
        assert_eq!(snap.state.human_score, 30);
        assert_eq!(snap.state.solved_by.get(&WordId::across(1)), Some(&Solver::Human));
    }

    #[tokio::test(start_paused = true)]
    async fn clock_ends_the_match() {
        let (handle, _task) = MatchEngine::spawn();
        handle.start_new_match(cpu_ram(), config(Some(3), 100)).unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.snapshot().unwrap().state.time_remaining, Some(2));

        tokio::time::sleep(Duration::from_secs(2)).await;
        let state = handle.snapshot().unwrap().state;
        assert_eq!(state.time_remaining, Some(0));
        assert_eq!(state.phase, Phase::Finished(MatchOutcome::Tie));

        // Timers are gone; nothing moves any more
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(handle.snapshot().unwrap().state, state);
    }

    #[tokio::test(start_paused = true)]
    async fn opponent_fills_the_grid() {
        let (handle, _task) = MatchEngine::spawn();
        let mut events = handle.subscribe();
        handle.start_new_match(cpu_ram(), config(None, 5)).unwrap();

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let state = handle.snapshot().unwrap().state;
        assert_eq!(state.opponent_score, 60);
        assert_eq!(state.phase, Phase::Finished(MatchOutcome::OpponentWin));

        let mut kinds = Vec::new();
        while let Ok(e) = events.try_recv() {
            kinds.push(e.event);
        }
        assert!(matches!(kinds[0], MatchEvent::MatchStarted { .. }));
        assert!(matches!(kinds[1], MatchEvent::OpponentSolved { points: 30, .. }));
        assert!(matches!(kinds[2], MatchEvent::OpponentSolved { points: 30, .. }));
        assert!(matches!(kinds[3], MatchEvent::MatchFinished { outcome: MatchOutcome::OpponentWin, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_ticks_are_ignored() {
        let (handle, _task) = MatchEngine::spawn();
        handle.start_new_match(cpu_ram(), config(Some(60), 100)).unwrap();
        handle.start_new_match(cpu_ram(), config(Some(60), 100)).unwrap();
        settle().await;

        for _ in 0..5 {
            handle.send_raw(Command::ClockTick { generation: 1 });
            handle.send_raw(Command::OpponentTick { generation: 1 });
        }
        settle().await;

        let snap = handle.snapshot().unwrap();
        assert_eq!(snap.generation, 2);
        assert_eq!(snap.state.time_remaining, Some(60));
        assert!(snap.state.solved_by.is_empty());

        handle.send_raw(Command::ClockTick { generation: 2 });
        settle().await;
        assert_eq!(handle.snapshot().unwrap().state.time_remaining, Some(59));
    }

    #[tokio::test(start_paused = true)]
    async fn old_timers_do_not_touch_the_new_match() {
        let (handle, _task) = MatchEngine::spawn();
        handle.start_new_match(cpu_ram(), config(Some(60), 2)).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        handle.start_new_match(cpu_ram(), config(None, 100)).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let state = handle.snapshot().unwrap().state;
        assert_eq!(state.time_remaining, None);
        assert!(state.solved_by.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unusable_ticker_period_leaves_the_engine_running() {
        let (handle, _task) = MatchEngine::spawn();
        handle.start_new_match(cpu_ram(), config(Some(3), u64::MAX)).unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let state = handle.snapshot().unwrap().state;
        assert_eq!(state.time_remaining, Some(0));
        assert_eq!(state.phase, Phase::Finished(MatchOutcome::Tie));

        handle.start_new_match(cpu_ram(), config(Some(60), 30)).unwrap();
        assert_eq!(handle.submit_guess(WordId::across(1), "CPU").await, Ok(GuessResult::Correct));
    }

    #[derive(Clone, Default)]
    struct RecordingStore(Arc<Mutex<Vec<MatchState>>>);

    impl MatchStore for RecordingStore {
        fn save(&self, state: &MatchState) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(state.clone());
            Ok(())
        }

        fn load(&self) -> anyhow::Result<Option<MatchState>> {
            Ok(self.0.lock().unwrap().last().cloned())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn finished_match_is_stored_once() {
        let store = RecordingStore::default();
        let (handle, _task) = MatchEngine::spawn_with_store(Box::new(store.clone()));
        handle.start_new_match(cpu_ram(), config(Some(60), 100)).unwrap();
        handle.submit_guess(WordId::across(1), "CPU").await.unwrap();
        handle.submit_guess(WordId::across(2), "RAM").await.unwrap();
        assert_eq!(handle.submit_guess(WordId::across(2), "RAM").await, Err(MatchError::MatchFinished));

        let saved = store.0.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].phase, Phase::Finished(MatchOutcome::HumanWin));
        assert_eq!(saved[0].human_score, 60);
        assert_eq!(store.load().unwrap().map(|s| s.human_score), Some(60));
    }

    #[tokio::test]
    async fn changed_follows_published_snapshots() {
        let (handle, task) = MatchEngine::spawn();
        let mut watcher = handle.clone();

        handle.start_new_match(cpu_ram(), config(None, 100)).unwrap();
        let snap = watcher.changed().await.unwrap().unwrap();
        assert_eq!(snap.generation, 1);
        assert_eq!(snap.state.human_score, 0);

        handle.submit_guess(WordId::across(1), "CPU").await.unwrap();
        let snap = watcher.changed().await.unwrap().unwrap();
        assert_eq!(snap.state.human_score, 30);

        handle.shutdown();
        task.await.unwrap();
        assert_eq!(watcher.changed().await, Err(MatchError::EngineClosed));
    }

    #[tokio::test]
    async fn shutdown_closes_the_handle() {
        let (handle, task) = MatchEngine::spawn();
        handle.shutdown();
        task.await.unwrap();
        assert_eq!(handle.submit_guess(WordId::across(1), "CPU").await, Err(MatchError::EngineClosed));
        assert_eq!(handle.start_new_match(cpu_ram(), MatchConfig::default()), Err(MatchError::EngineClosed));
    }
}
