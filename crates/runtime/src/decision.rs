//! Decision loop for one autonomous actor's turn.
//!
//! Runs upkeep, then repeatedly picks an action through the AI filter and
//! resolves it until the actor is gone, out of action points, has nothing
//! affordable, or the turn is force-closed. The "turn finished" signal is
//! carried by a drop guard so it fires exactly once however the loop ends.
use std::sync::Arc;
use std::time::Duration;

use battle_core::ai::{self, DecisionContext};
use battle_core::{ActorId, Controller, Origin, Pipeline, Resolution, World};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::NetMessage;
use crate::context::{Arena, BattleContext};
use crate::scheduler::TurnContext;

/// Fires the turn-finished signal once, on [`finish`](Self::finish) or drop.
pub(crate) struct FinishGuard {
    actor: ActorId,
    tx: Option<oneshot::Sender<()>>,
}

impl FinishGuard {
    pub(crate) fn new(actor: ActorId, tx: oneshot::Sender<()>) -> Self {
        Self {
            actor,
            tx: Some(tx),
        }
    }

    pub(crate) fn finish(&mut self) {
        if let Some(tx) = self.tx.take() {
            debug!(target: "runtime::decision", actor = %self.actor, "turn finished");
            // The scheduler may already have moved on.
            let _ = tx.send(());
        }
    }
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

/// One pass of the loop.
struct Step {
    resolution: Resolution,
    acted: bool,
    /// Actor can still act after this step.
    more: bool,
}

pub(crate) async fn run_turn<W>(
    ctx: Arc<BattleContext<W>>,
    actor: ActorId,
    turn: TurnContext,
    token: CancellationToken,
    mut guard: FinishGuard,
) where
    W: World + Send + 'static,
{
    let mut upkeep = true;

    while !token.is_cancelled() {
        let step = {
            let mut arena = ctx.arena.lock().await;
            resolve_step(&ctx, &mut arena, &actor, turn, upkeep)
        };
        upkeep = false;

        ctx.emit_combat(&step.resolution.events);
        ctx.schedule_removals(&step.resolution);
        if !step.acted {
            break;
        }

        let mut paced = true;
        for intent in step.resolution.stage_intents() {
            ctx.broadcast(NetMessage::AbilityUsed {
                intent: intent.clone(),
            })
            .await;
            if !pace(&token, ctx.config.stage_pacing).await {
                paced = false;
                break;
            }
        }
        if !paced || !step.more || !pace(&token, ctx.config.decision_pacing).await {
            break;
        }
    }

    if token.is_cancelled() {
        debug!(target: "runtime::decision", %actor, "turn force-closed");
    }
    guard.finish();
}

/// Resolves at most one action for `actor` under the world lock.
fn resolve_step<W: World>(
    ctx: &BattleContext<W>,
    arena: &mut Arena<W>,
    actor: &ActorId,
    turn: TurnContext,
    upkeep: bool,
) -> Step {
    let Arena { world, rng } = arena;
    let mut events = Vec::new();

    if upkeep {
        let mut pipeline = Pipeline::new(&mut *world, &mut *rng);
        if let Err(error) = pipeline.begin_turn(actor) {
            debug!(target: "runtime::decision", %actor, %error, "no upkeep");
        }
        events = pipeline.finish().events;
    }

    let Some(snapshot) = world
        .actor(actor)
        .filter(|a| a.is_alive() && a.action_points > 0)
        .cloned()
    else {
        return Step {
            resolution: Resolution { events },
            acted: false,
            more: false,
        };
    };

    let decision = DecisionContext {
        turn_in_wave: turn.turn_in_wave,
        boss_wave: turn.boss_wave,
    };
    let Some(action) = ai::choose(&snapshot, &ctx.catalogue, &*world, decision, rng) else {
        debug!(target: "runtime::decision", %actor, "nothing affordable");
        return Step {
            resolution: Resolution { events },
            acted: false,
            more: false,
        };
    };

    let origin = match snapshot.controller {
        Controller::AllyAi => Origin::ALLY_AI,
        Controller::HostileAi => Origin::HOSTILE_AI,
        Controller::Player => Origin::PLAYER,
    };
    let mut pipeline = Pipeline::new(&mut *world, &mut *rng).with_difficulty(turn.difficulty);
    let acted = match pipeline.resolve(action, actor, origin, None) {
        Ok(()) => true,
        Err(error) => {
            warn!(
                target: "runtime::decision",
                %actor,
                action = %action.id,
                %error,
                code = error.error_code(),
                "action rejected"
            );
            false
        }
    };
    events.extend(pipeline.finish().events);
    let more = acted
        && world
            .actor(actor)
            .is_some_and(|a| a.is_alive() && a.action_points > 0);

    Step {
        resolution: Resolution { events },
        acted,
        more,
    }
}

/// Cancellable delay. Returns false if `token` fired first.
pub(crate) async fn pace(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_fires_on_drop() {
        let (tx, rx) = oneshot::channel();
        {
            let _guard = FinishGuard::new(ActorId::from("horde-front-0"), tx);
        }
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn explicit_finish_then_drop_fires_once() {
        let (tx, mut rx) = oneshot::channel();
        let mut guard = FinishGuard::new(ActorId::from("horde-front-0"), tx);
        guard.finish();
        assert!(rx.try_recv().is_ok());
        drop(guard);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_stops_on_cancel() {
        let token = CancellationToken::new();
        let child = token.child_token();
        token.cancel();
        assert!(!pace(&child, Duration::from_secs(60)).await);
    }
}
