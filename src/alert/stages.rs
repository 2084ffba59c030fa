//! Stage handlers and table builder.
//!
//! ```text
//!  NORMAL ──[breach]──▶ PENDING ──[breach held hold_ms]──▶ ACTIVE ◀──┐
//!    ▲                     │                                │        │
//!    │                 [cleared]                        [cleared] [breach]
//!    ├─────────────────────┘                                ▼        │
//!    └────[clear held max(recovery, grace)]──────────── RECOVERING ──┘
//! ```
//!
//! Notifications: on Pending → Active (raised), every `renotify_ms` while
//! Active (reminder), and on Recovering → Active when the reminder period
//! has passed (re-raised).

use log::info;

use super::context::AlertContext;
use super::{AlertStage, StageDescriptor};
use crate::notify::NotificationKind;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub const fn build_stage_table() -> [StageDescriptor; AlertStage::COUNT] {
    [
        StageDescriptor {
            stage: AlertStage::Normal,
            name: "Normal",
            on_enter: Some(normal_enter),
            on_update: normal_update,
        },
        StageDescriptor {
            stage: AlertStage::Pending,
            name: "Pending",
            on_enter: None,
            on_update: pending_update,
        },
        StageDescriptor {
            stage: AlertStage::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_update: active_update,
        },
        StageDescriptor {
            stage: AlertStage::Recovering,
            name: "Recovering",
            on_enter: None,
            on_update: recovering_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  NORMAL
// ═══════════════════════════════════════════════════════════════════════════

fn normal_enter(ctx: &mut AlertContext) {
    ctx.last_notified_at_ms = None;
}

fn normal_update(ctx: &mut AlertContext) -> Option<AlertStage> {
    ctx.breached.then_some(AlertStage::Pending)
}

// ═══════════════════════════════════════════════════════════════════════════
//  PENDING: breach seen, waiting out the hold time
// ═══════════════════════════════════════════════════════════════════════════

fn pending_update(ctx: &mut AlertContext) -> Option<AlertStage> {
    if !ctx.breached {
        return Some(AlertStage::Normal);
    }
    (ctx.in_stage_ms() >= ctx.timers.hold_ms).then_some(AlertStage::Active)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut AlertContext) {
    match ctx.previous {
        AlertStage::Recovering if ctx.timers.renotify_ms.is_some() && !ctx.renotify_due() => {
            info!(
                "ALERT {}: back beyond threshold, notification suppressed",
                ctx.cause.as_str()
            );
        }
        AlertStage::Recovering => ctx.notify(NotificationKind::Reraised),
        _ => ctx.notify(NotificationKind::Raised),
    }
}

fn active_update(ctx: &mut AlertContext) -> Option<AlertStage> {
    if !ctx.breached {
        return Some(AlertStage::Recovering);
    }
    if ctx.timers.renotify_ms.is_some() && ctx.renotify_due() {
        ctx.notify(NotificationKind::Reminder);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RECOVERING: cleared, waiting out recovery and grace
// ═══════════════════════════════════════════════════════════════════════════

fn recovering_update(ctx: &mut AlertContext) -> Option<AlertStage> {
    if ctx.breached {
        return Some(AlertStage::Active);
    }
    (ctx.in_stage_ms() >= ctx.timers.settle_ms()).then_some(AlertStage::Normal)
}
