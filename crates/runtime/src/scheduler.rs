//! Non-player phase scheduling.
//!
//! [`TurnScheduler::run_phase`] runs the ally AI group and then the hostile
//! group. Each member gets a timeout window; the authority drives the member's
//! decision loop while followers wait for the replicated `TurnFinished`. One
//! cancellation token covers the whole phase and every actor gets a child of
//! it, so a timeout closes one turn while [`TurnScheduler::cancel`] unwinds
//! everything.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use battle_core::{ActorId, Controller, Side, World};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{NetMessage, Result, RuntimeError};
use crate::context::BattleContext;
use crate::decision::{self, FinishGuard};
use crate::events::{Group, PhaseOutcome, TurnEvent};

/// Whether this participant resolves autonomous turns or replays them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Authority,
    Follower,
}

/// Match status checked between phase steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    /// No living hostile remains.
    Victory,
    /// No living party member remains.
    Defeat,
}

/// Wave progress and tuning visible to autonomous actors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnContext {
    pub wave: u32,
    pub turn_in_wave: u32,
    pub boss_wave: bool,
    /// Multiplier on hostile offensive rolls.
    pub difficulty: f32,
}

impl Default for TurnContext {
    fn default() -> Self {
        Self {
            wave: 1,
            turn_in_wave: 1,
            boss_wave: false,
            difficulty: 1.0,
        }
    }
}

impl TurnContext {
    /// Starts the next wave at turn one.
    pub fn next_wave(self, boss_wave: bool) -> Self {
        Self {
            wave: self.wave + 1,
            turn_in_wave: 1,
            boss_wave,
            ..self
        }
    }
}

/// Summary of a completed phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub outcome: PhaseOutcome,
    /// Every member whose turn was processed, in order.
    pub processed: Vec<ActorId>,
    /// Members whose turn had to be force-closed.
    pub timed_out: Vec<ActorId>,
}

impl PhaseReport {
    fn new() -> Self {
        Self {
            outcome: PhaseOutcome::ControlReturned,
            processed: Vec::new(),
            timed_out: Vec::new(),
        }
    }
}

pub struct TurnScheduler<W> {
    ctx: Arc<BattleContext<W>>,
    role: Role,
    active: AtomicBool,
    phase: Mutex<Option<CancellationToken>>,
    turn: Mutex<TurnContext>,
    finishes: Mutex<Finishes>,
}

/// Follower bookkeeping for replicated `TurnFinished` messages.
#[derive(Default)]
struct Finishes {
    /// Actors whose finish is being waited on.
    awaiting: HashMap<ActorId, oneshot::Sender<()>>,
    /// Finishes that arrived before their actor's turn came up here.
    early: HashSet<ActorId>,
}

/// Cancels the phase token and clears the active flag when the phase ends,
/// however it ends. Dropping the phase future therefore stops any decision
/// loop it spawned.
struct ActivePhase<'s, W> {
    scheduler: &'s TurnScheduler<W>,
}

impl<W> Drop for ActivePhase<'_, W> {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.scheduler.phase).take() {
            token.cancel();
        }
        let mut finishes = lock(&self.scheduler.finishes);
        finishes.awaiting.clear();
        finishes.early.clear();
        drop(finishes);
        self.scheduler.active.store(false, Ordering::Release);
    }
}

impl<W> TurnScheduler<W>
where
    W: World + Send + 'static,
{
    pub(crate) fn new(ctx: Arc<BattleContext<W>>, role: Role, turn: TurnContext) -> Self {
        Self {
            ctx,
            role,
            active: AtomicBool::new(false),
            phase: Mutex::new(None),
            turn: Mutex::new(turn),
            finishes: Mutex::new(Finishes::default()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn turn_context(&self) -> TurnContext {
        *lock(&self.turn)
    }

    pub fn set_turn_context(&self, turn: TurnContext) {
        *lock(&self.turn) = turn;
    }

    /// Cancels the running phase, if any.
    pub fn cancel(&self) {
        if let Some(token) = lock(&self.phase).as_ref() {
            info!(target: "runtime::scheduler", "phase cancellation requested");
            token.cancel();
        }
    }

    /// Delivers a replicated `TurnFinished`.
    ///
    /// A finish for an actor that is not awaited yet is kept until that
    /// actor's turn comes up or the phase ends.
    pub fn notify_finished(&self, actor: &ActorId) {
        let mut finishes = lock(&self.finishes);
        match finishes.awaiting.remove(actor) {
            Some(tx) => {
                let _ = tx.send(());
            }
            None => {
                debug!(target: "runtime::scheduler", %actor, "early finish buffered");
                finishes.early.insert(actor.clone());
            }
        }
    }

    pub async fn status(&self) -> GameStatus {
        let arena = self.ctx.arena.lock().await;
        if arena.world.living(Side::Horde).is_empty() {
            GameStatus::Victory
        } else if arena.world.living(Side::Party).is_empty() {
            GameStatus::Defeat
        } else {
            GameStatus::Ongoing
        }
    }

    /// Runs one non-player phase.
    ///
    /// A second call while a phase is running is rejected with
    /// [`RuntimeError::ReentrantTurn`] and leaves the running phase alone.
    pub async fn run_phase(&self) -> Result<PhaseReport> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(
                target: "runtime::scheduler",
                error = %RuntimeError::ReentrantTurn,
                "double turn rejected"
            );
            return Err(RuntimeError::ReentrantTurn);
        }
        let _active = ActivePhase { scheduler: self };
        let token = CancellationToken::new();
        *lock(&self.phase) = Some(token.clone());

        let turn = self.turn_context();
        info!(
            target: "runtime::scheduler",
            wave = turn.wave,
            turn = turn.turn_in_wave,
            role = ?self.role,
            "non-player phase started"
        );
        self.ctx.sink.clear_interaction();
        self.ctx.emit_turn(TurnEvent::PhaseStarted {
            wave: turn.wave,
            turn_in_wave: turn.turn_in_wave,
        });

        let mut report = PhaseReport::new();
        let result = self.drive(&token, turn, &mut report).await;

        let outcome = match &result {
            Ok(outcome) => *outcome,
            Err(_) => PhaseOutcome::Cancelled,
        };
        info!(target: "runtime::scheduler", ?outcome, "non-player phase ended");
        self.ctx.emit_turn(TurnEvent::PhaseEnded { outcome });

        result.map(|outcome| PhaseReport { outcome, ..report })
    }

    async fn drive(
        &self,
        token: &CancellationToken,
        turn: TurnContext,
        report: &mut PhaseReport,
    ) -> Result<PhaseOutcome> {
        self.settle(token).await?;
        if let Some(outcome) = self.concluded().await {
            return Ok(outcome);
        }

        let allies = self.members(Side::Party, Controller::AllyAi).await;
        if !allies.is_empty() {
            self.run_group(Group::Allies, allies, token, turn, report)
                .await?;
            self.settle(token).await?;
            if let Some(outcome) = self.concluded().await {
                return Ok(outcome);
            }
        }

        let hostiles = self.members(Side::Horde, Controller::HostileAi).await;
        self.run_group(Group::Hostiles, hostiles, token, turn, report)
            .await?;
        self.settle(token).await?;
        if let Some(outcome) = self.concluded().await {
            return Ok(outcome);
        }

        lock(&self.turn).turn_in_wave += 1;
        Ok(PhaseOutcome::ControlReturned)
    }

    async fn run_group(
        &self,
        group: Group,
        members: Vec<ActorId>,
        token: &CancellationToken,
        turn: TurnContext,
        report: &mut PhaseReport,
    ) -> Result<()> {
        debug!(target: "runtime::scheduler", ?group, members = members.len(), "group started");
        self.ctx.emit_turn(TurnEvent::GroupStarted {
            group,
            members: members.len(),
        });

        for actor in members {
            if token.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }
            let Some(action_points) = self.living_action_points(&actor).await else {
                debug!(target: "runtime::scheduler", %actor, "member gone, skipped");
                continue;
            };

            let timeout = self.ctx.config.turn_timeout(action_points);
            let forced = self.run_member(&actor, timeout, token, turn).await?;
            if forced {
                report.timed_out.push(actor.clone());
            }
            report.processed.push(actor);
        }
        Ok(())
    }

    /// Runs one member's turn. Returns whether it had to be forced closed.
    async fn run_member(
        &self,
        actor: &ActorId,
        timeout: Duration,
        token: &CancellationToken,
        turn: TurnContext,
    ) -> Result<bool> {
        self.ctx.emit_turn(TurnEvent::ActorStarted {
            actor: actor.clone(),
            timeout,
        });

        let (tx, mut finished) = oneshot::channel();
        let actor_token = token.child_token();
        match self.role {
            Role::Authority => {
                let guard = FinishGuard::new(actor.clone(), tx);
                tokio::spawn(decision::run_turn(
                    Arc::clone(&self.ctx),
                    actor.clone(),
                    turn,
                    actor_token.clone(),
                    guard,
                ));
            }
            Role::Follower => {
                let mut finishes = lock(&self.finishes);
                if finishes.early.remove(actor) {
                    let _ = tx.send(());
                } else {
                    finishes.awaiting.insert(actor.clone(), tx);
                }
            }
        }

        let forced = tokio::select! {
            biased;
            _ = token.cancelled() => {
                lock(&self.finishes).awaiting.remove(actor);
                return Err(RuntimeError::Cancelled);
            }
            _ = &mut finished => false,
            _ = tokio::time::sleep(timeout) => true,
        };

        if forced {
            warn!(
                target: "runtime::scheduler",
                error = %RuntimeError::Timeout { actor: actor.clone(), timeout },
                "forcing turn closed"
            );
            actor_token.cancel();
            let grace = self.ctx.config.finish_grace;
            if tokio::time::timeout(grace, &mut finished).await.is_err() {
                debug!(target: "runtime::scheduler", %actor, ?grace, "no finish within grace");
            }
            lock(&self.finishes).awaiting.remove(actor);
        }

        if self.role == Role::Authority {
            self.ctx
                .broadcast(NetMessage::TurnFinished {
                    actor: actor.clone(),
                })
                .await;
        }
        self.ctx.emit_turn(TurnEvent::ActorFinished {
            actor: actor.clone(),
            forced,
        });
        Ok(forced)
    }

    async fn settle(&self, token: &CancellationToken) -> Result<()> {
        if decision::pace(token, self.ctx.config.settle).await {
            Ok(())
        } else {
            Err(RuntimeError::Cancelled)
        }
    }

    async fn concluded(&self) -> Option<PhaseOutcome> {
        match self.status().await {
            GameStatus::Ongoing => None,
            GameStatus::Victory => Some(PhaseOutcome::Victory),
            GameStatus::Defeat => Some(PhaseOutcome::Defeat),
        }
    }

    /// Snapshot of the living members of a group, front row first.
    async fn members(&self, side: Side, controller: Controller) -> Vec<ActorId> {
        let arena = self.ctx.arena.lock().await;
        arena
            .world
            .living(side)
            .into_iter()
            .filter(|id| {
                arena
                    .world
                    .actor(id)
                    .is_some_and(|a| a.controller == controller)
            })
            .collect()
    }

    async fn living_action_points(&self, actor: &ActorId) -> Option<u32> {
        let arena = self.ctx.arena.lock().await;
        arena
            .world
            .actor(actor)
            .filter(|a| a.is_alive())
            .map(|a| a.starting_action_points)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
