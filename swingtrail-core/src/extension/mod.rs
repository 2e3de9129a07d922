//! Extension layer: veto components and decision attribution, attached to the
//! simulator purely through its hook points.

pub mod chain;
pub mod components;

pub use chain::{
    AttributionReport, ComponentStats, NoOpHook, VetoChain, VetoCheck, VetoComponent, VetoRecord,
};
pub use components::{ConfidenceVeto, CooldownVeto, LevelAgeVeto};

use serde::{Deserialize, Serialize};

use crate::error::{require_non_negative, ConfigError};

/// Which built-in components to chain, in evaluation order
/// cooldown → confidence → level age. Unset fields are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub enabled: bool,
    pub cooldown_bars: Option<usize>,
    pub min_confidence: Option<f64>,
    pub max_level_age: Option<usize>,
}

impl ExtensionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(c) = self.min_confidence {
            require_non_negative("extension.min_confidence", c)?;
        }
        Ok(())
    }

    /// `None` when the extension layer is disabled.
    pub fn build_chain(&self) -> Option<VetoChain> {
        if !self.enabled {
            return None;
        }
        let mut components: Vec<Box<dyn VetoComponent>> = Vec::new();
        if let Some(bars) = self.cooldown_bars {
            components.push(Box::new(CooldownVeto::new(bars)));
        }
        if let Some(min) = self.min_confidence {
            components.push(Box::new(ConfidenceVeto::new(min)));
        }
        if let Some(age) = self.max_level_age {
            components.push(Box::new(LevelAgeVeto::new(age)));
        }
        Some(VetoChain::new(components))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, PositionSide};
    use crate::engine::{
        Decision, DecisionContext, ExecutionEvent, ExecutionKind, HookVerdict, SimulationHook,
    };
    use crate::ledger::{ExecutionReason, ExecutionResult};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn entry(confidence: f64) -> Decision {
        Decision {
            action: Action::Long,
            size: 1.0,
            confidence,
            ..Decision::default()
        }
    }

    fn ctx<'a>(bar: usize, decision: &'a Decision, age: Option<usize>) -> DecisionContext<'a> {
        DecisionContext {
            bar_index: bar,
            timestamp: ts(),
            symbol: "BTCUSDT",
            timeframe: "1h",
            price: 100.0,
            decision,
            open_side: None,
            level_data_age: age,
        }
    }

    fn opened(bar: usize) -> ExecutionEvent {
        ExecutionEvent {
            bar_index: bar,
            timestamp: ts(),
            kind: ExecutionKind::Entry,
            action: Action::Long,
            price: 100.0,
            result: ExecutionResult {
                executed: true,
                reason: ExecutionReason::Opened,
            },
            exit_reason: None,
        }
    }

    #[test]
    fn cooldown_only_starts_on_confirmed_entries() {
        let mut cooldown = CooldownVeto::new(3);
        let d = entry(1.0);
        assert!(cooldown.check(&ctx(0, &d, None)).allowed);
        assert!(cooldown.check(&ctx(1, &d, None)).allowed);
        assert_eq!(cooldown.last_entry_bar(), None);

        cooldown.on_execution(&opened(1));
        assert!(!cooldown.check(&ctx(2, &d, None)).allowed);
        assert!(!cooldown.check(&ctx(3, &d, None)).allowed);
        assert!(cooldown.check(&ctx(4, &d, None)).allowed);
    }

    #[test]
    fn chain_is_logical_and_with_first_veto_recorded() {
        let config = ExtensionConfig {
            enabled: true,
            cooldown_bars: Some(2),
            min_confidence: Some(0.6),
            max_level_age: Some(3),
        };
        let mut chain = config.build_chain().unwrap();

        let weak = entry(0.4);
        assert!(chain.on_decision(&ctx(0, &weak, Some(0))).is_veto());

        let strong = entry(0.9);
        assert_eq!(chain.on_decision(&ctx(1, &strong, Some(1))), HookVerdict::Allow);
        assert!(chain.on_decision(&ctx(2, &strong, Some(5))).is_veto());

        let report = chain.report();
        assert_eq!(report.decisions_seen, 3);
        assert_eq!(report.decisions_vetoed, 2);
        assert_eq!(report.vetoes[0].component, "confidence");
        assert_eq!(report.vetoes[1].component, "level_age");
        let confidence = &report.components[1];
        assert_eq!(confidence.evaluated, 3);
        assert_eq!(confidence.vetoed, 1);
        assert_eq!(confidence.min_confidence, Some(0.4));
        assert_eq!(confidence.max_confidence, Some(0.9));
        assert!((confidence.allow_rate() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.components[2].evaluated, 2);
    }

    #[test]
    fn non_opening_decisions_bypass_components() {
        let mut chain = ExtensionConfig {
            enabled: true,
            cooldown_bars: Some(10),
            min_confidence: Some(0.5),
            ..ExtensionConfig::default()
        }
        .build_chain()
        .unwrap();
        chain.on_execution(&opened(0));

        let none = Decision::default();
        assert_eq!(chain.on_decision(&ctx(1, &none, None)), HookVerdict::Allow);

        // Close-only signal from a long-only evaluator, inside the cooldown.
        let close = Decision {
            action: Action::Short,
            size: 0.0,
            ..Decision::default()
        };
        let mut held = ctx(2, &close, None);
        held.open_side = Some(PositionSide::Long);
        assert!(!held.opens_position());
        assert_eq!(chain.on_decision(&held), HookVerdict::Allow);

        // Same-side repeat while long: the ledger would reject it anyway.
        let repeat = entry(0.1);
        let mut held = ctx(3, &repeat, None);
        held.open_side = Some(PositionSide::Long);
        assert_eq!(chain.on_decision(&held), HookVerdict::Allow);

        assert_eq!(chain.report().decisions_seen, 0);
        assert!(chain.report().components.iter().all(|c| c.evaluated == 0));

        // A reversal would open a short, so it is gated.
        let reversal = Decision {
            action: Action::Short,
            ..entry(0.9)
        };
        let mut held = ctx(4, &reversal, None);
        held.open_side = Some(PositionSide::Long);
        assert!(held.opens_position());
        assert!(chain.on_decision(&held).is_veto());
        assert_eq!(chain.report().vetoes[0].component, "cooldown");
    }

    #[test]
    fn execution_counters_follow_events() {
        let mut chain = VetoChain::new(vec![Box::new(CooldownVeto::new(5))]);
        chain.on_execution(&opened(3));
        let mut exit = opened(4);
        exit.kind = ExecutionKind::Exit;
        exit.action = Action::from(PositionSide::Short);
        chain.on_execution(&exit);
        assert_eq!(chain.report().entries_executed, 1);
        assert_eq!(chain.report().exits_executed, 1);
    }

    #[test]
    fn disabled_config_builds_nothing() {
        assert!(ExtensionConfig::default().build_chain().is_none());
        assert!(ExtensionConfig {
            min_confidence: Some(-0.1),
            ..ExtensionConfig::default()
        }
        .validate()
        .is_err());
    }
}
