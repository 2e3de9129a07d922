//! Ordered veto chain with per-component attribution.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::{DecisionContext, ExecutionEvent, ExecutionKind, HookVerdict, SimulationHook};

/// One component's verdict on one entry decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetoCheck {
    pub allowed: bool,
    /// Component-specific score in [0, 1].
    pub confidence: f64,
    pub reason: String,
}

impl VetoCheck {
    pub fn allow(confidence: f64) -> Self {
        Self {
            allowed: true,
            confidence,
            reason: String::new(),
        }
    }

    pub fn veto(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            confidence,
            reason: reason.into(),
        }
    }
}

/// An independent gate on entry decisions.
///
/// `check` must not mutate anything: state that depends on trades belongs in
/// `on_execution`, which only sees confirmed executions.
pub trait VetoComponent: Send {
    fn name(&self) -> &str;

    fn check(&self, ctx: &DecisionContext<'_>) -> VetoCheck;

    fn on_execution(&mut self, _event: &ExecutionEvent) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStats {
    pub name: String,
    pub evaluated: usize,
    pub allowed: usize,
    pub vetoed: usize,
    pub min_confidence: Option<f64>,
    pub max_confidence: Option<f64>,
    confidence_sum: f64,
}

impl ComponentStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            evaluated: 0,
            allowed: 0,
            vetoed: 0,
            min_confidence: None,
            max_confidence: None,
            confidence_sum: 0.0,
        }
    }

    fn record(&mut self, check: &VetoCheck) {
        self.evaluated += 1;
        if check.allowed {
            self.allowed += 1;
        } else {
            self.vetoed += 1;
        }
        let c = check.confidence;
        self.min_confidence = Some(self.min_confidence.map_or(c, |m| m.min(c)));
        self.max_confidence = Some(self.max_confidence.map_or(c, |m| m.max(c)));
        self.confidence_sum += c;
    }

    pub fn allow_rate(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            self.allowed as f64 / self.evaluated as f64
        }
    }

    pub fn avg_confidence(&self) -> Option<f64> {
        (self.evaluated > 0).then(|| self.confidence_sum / self.evaluated as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetoRecord {
    pub bar_index: usize,
    pub component: String,
    pub reason: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributionReport {
    /// Decisions that would open a position, offered to the chain.
    pub decisions_seen: usize,
    pub decisions_vetoed: usize,
    pub entries_executed: usize,
    pub exits_executed: usize,
    pub components: Vec<ComponentStats>,
    pub vetoes: Vec<VetoRecord>,
}

/// Components evaluated in order; the first veto wins (logical AND).
pub struct VetoChain {
    components: Vec<Box<dyn VetoComponent>>,
    report: AttributionReport,
}

impl VetoChain {
    pub fn new(components: Vec<Box<dyn VetoComponent>>) -> Self {
        let stats = components.iter().map(|c| ComponentStats::new(c.name())).collect();
        Self {
            components,
            report: AttributionReport {
                components: stats,
                ..AttributionReport::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn report(&self) -> &AttributionReport {
        &self.report
    }

    pub fn into_report(self) -> AttributionReport {
        self.report
    }
}

impl SimulationHook for VetoChain {
    fn on_decision(&mut self, ctx: &DecisionContext<'_>) -> HookVerdict {
        if !ctx.opens_position() {
            return HookVerdict::Allow;
        }
        self.report.decisions_seen += 1;

        for (component, stats) in self.components.iter().zip(self.report.components.iter_mut()) {
            let check = component.check(ctx);
            stats.record(&check);
            if !check.allowed {
                debug!(
                    "bar {}: {} vetoed by {}: {}",
                    ctx.bar_index,
                    ctx.decision.action,
                    component.name(),
                    check.reason
                );
                self.report.decisions_vetoed += 1;
                self.report.vetoes.push(VetoRecord {
                    bar_index: ctx.bar_index,
                    component: component.name().to_string(),
                    reason: check.reason.clone(),
                    confidence: check.confidence,
                });
                return HookVerdict::Veto {
                    component: component.name().to_string(),
                    reason: check.reason,
                };
            }
        }
        HookVerdict::Allow
    }

    fn on_execution(&mut self, event: &ExecutionEvent) {
        match event.kind {
            ExecutionKind::Entry => self.report.entries_executed += 1,
            ExecutionKind::Exit => self.report.exits_executed += 1,
        }
        for component in &mut self.components {
            component.on_execution(event);
        }
    }
}

/// Hook that allows everything and records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHook;

impl SimulationHook for NoOpHook {
    fn on_decision(&mut self, _ctx: &DecisionContext<'_>) -> HookVerdict {
        HookVerdict::Allow
    }

    fn on_execution(&mut self, _event: &ExecutionEvent) {}
}
